use serde::{Deserialize, Serialize};

/// A simulated procedure and the substances it must not be used with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub substance: String,
    #[serde(default)]
    pub contraindications: Vec<String>,
}

impl Procedure {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        substance: impl Into<String>,
        contraindications: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            substance: substance.into(),
            contraindications: contraindications.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Read-only procedure catalog, loaded once at startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcedureCatalog {
    procedures: Vec<Procedure>,
}

impl ProcedureCatalog {
    pub fn new(procedures: Vec<Procedure>) -> Self {
        Self { procedures }
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    pub fn find(&self, id: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

pub fn default_procedures() -> Vec<Procedure> {
    vec![
        Procedure::new(
            "dermal-filler-cheek",
            "Cheek Filler",
            "Hyaluronic acid",
            &["Hyaluronic acid", "Lidocaine"],
        )
        .with_description("Dermal filler for cheek augmentation"),
        Procedure::new(
            "dermal-filler-nasolabial",
            "Nasolabial Filler",
            "Hyaluronic acid",
            &["Hyaluronic acid"],
        )
        .with_description("Filler for smile lines"),
        Procedure::new(
            "botox-forehead",
            "Forehead Botox",
            "Botulinum toxin type A",
            &["Botulinum toxin", "Botox"],
        )
        .with_description("Botulinum toxin for forehead lines"),
        Procedure::new(
            "botox-crowsfeet",
            "Crow's Feet Botox",
            "Botulinum toxin type A",
            &["Botulinum toxin", "Botox"],
        )
        .with_description("Botulinum toxin for eye area"),
        Procedure::new(
            "lip-filler",
            "Lip Filler",
            "Hyaluronic acid",
            &["Hyaluronic acid", "Lidocaine"],
        )
        .with_description("Dermal filler for lip enhancement"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_lookup() {
        let catalog = ProcedureCatalog::new(default_procedures());
        assert_eq!(catalog.len(), 5);

        let lip = catalog.find("lip-filler").unwrap();
        assert_eq!(lip.substance, "Hyaluronic acid");
        assert!(catalog.find("rhinoplasty").is_none());
    }

    #[test]
    fn test_procedure_without_optional_fields() {
        let p: Procedure = toml::from_str(
            r#"
            id = "thread-lift"
            name = "Thread Lift"
            substance = "Polydioxanone"
            "#,
        )
        .unwrap();
        assert!(p.contraindications.is_empty());
        assert!(p.description.is_empty());
    }
}
