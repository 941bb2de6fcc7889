//! Patient session context captured at onboarding
//!
//! The context is immutable once built; both the calibration engine and the
//! safety validator only ever borrow it.

use crate::errors::ScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Medical history as entered on the onboarding form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub allergies: Vec<String>,
    pub medications: Vec<String>,
    pub previous_procedures: Vec<String>,
    pub medical_conditions: Vec<String>,
}

impl MedicalHistory {
    pub fn with_allergies<I, S>(allergies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allergies: allergies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn normalized(self) -> Self {
        Self {
            allergies: clean_entries(self.allergies),
            medications: clean_entries(self.medications),
            previous_procedures: clean_entries(self.previous_procedures),
            medical_conditions: clean_entries(self.medical_conditions),
        }
    }
}

fn clean_entries(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    patient_id: Uuid,
    created_at: DateTime<Utc>,
    history: MedicalHistory,
}

impl SessionContext {
    /// Create a context for a new patient.
    ///
    /// At least one allergy entry is required ("None" counts).
    pub fn new(history: MedicalHistory) -> Result<Self, ScanError> {
        Self::with_patient_id(Uuid::new_v4(), history)
    }

    pub fn with_patient_id(patient_id: Uuid, history: MedicalHistory) -> Result<Self, ScanError> {
        let history = history.normalized();
        if history.allergies.is_empty() {
            return Err(ScanError::InvalidSession(
                "at least one allergy entry is required (enter \"None\" if there are none)"
                    .to_string(),
            ));
        }

        log::info!(
            "Session context created for patient {} ({} allergy entries)",
            patient_id,
            history.allergies.len()
        );

        Ok(Self {
            patient_id,
            created_at: Utc::now(),
            history,
        })
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn allergies(&self) -> &[String] {
        &self.history.allergies
    }

    pub fn history(&self) -> &MedicalHistory {
        &self.history
    }
}
