use anyhow::{bail, Context, Result};
use scanguard::calibration::LuminanceReading;
use scanguard::prelude::*;
use std::env;

struct Options {
    json: bool,
    config: ScanGuardConfig,
    positional: Vec<String>,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut json = false;
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => json = true,
            "--config" => {
                i += 1;
                let path = args.get(i).context("--config requires a path")?;
                config_path = Some(path.clone());
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => ScanGuardConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => ScanGuardConfig::load_or_default(),
    };

    Ok(Options {
        json,
        config,
        positional,
    })
}

fn main() -> Result<()> {
    scanguard::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: scanguard-cli <command> [args] [--config <path>] [--json]");
        eprintln!("Commands: list-procedures, list-zones, check-procedure, check-point, luminance, print-config");
        std::process::exit(1);
    }

    let command = &args[1];
    let opts = parse_options(&args[2..])?;
    match command.as_str() {
        "list-procedures" => cmd_list_procedures(&opts),
        "list-zones" => cmd_list_zones(&opts),
        "check-procedure" => cmd_check_procedure(&opts),
        "check-point" => cmd_check_point(&opts),
        "luminance" => cmd_luminance(&opts),
        "print-config" => cmd_print_config(&opts),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_list_procedures(opts: &Options) -> Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string(&opts.config.procedures)?);
    } else {
        for p in &opts.config.procedures {
            println!(
                "{}: {} ({}) contraindications: {}",
                p.id,
                p.name,
                p.substance,
                p.contraindications.join(", ")
            );
        }
    }
    Ok(())
}

fn cmd_list_zones(opts: &Options) -> Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string(&opts.config.zones)?);
    } else {
        for z in &opts.config.zones {
            println!("{} [{}] {:?}", z.name, z.classification, z.region);
        }
    }
    Ok(())
}

/// Print the outcome of a check, as JSON or text
fn report(opts: &Options, subject: &str, outcome: std::result::Result<(), ScanError>) -> Result<()> {
    if opts.json {
        let value = match &outcome {
            Ok(()) => serde_json::json!({ "subject": subject, "accepted": true }),
            Err(e) => serde_json::json!({
                "subject": subject,
                "accepted": false,
                "reason": e.reason_code(),
                "message": e.to_string(),
            }),
        };
        println!("{}", value);
    } else {
        match &outcome {
            Ok(()) => println!("{}: accepted", subject),
            Err(e) => println!("{}: rejected [{}] {}", subject, e.reason_code(), e),
        }
    }
    Ok(())
}

fn cmd_check_procedure(opts: &Options) -> Result<()> {
    let Some((id, allergies)) = opts.positional.split_first() else {
        bail!("Usage: scanguard-cli check-procedure <procedure_id> <allergy>...");
    };

    let (zones, procedures) = opts.config.catalogs();
    let validator = SafetyValidator::new(&zones, &procedures);
    let context = SessionContext::new(MedicalHistory::with_allergies(allergies.iter().cloned()))?;

    let procedure = validator.procedure(id)?;
    report(opts, id, validator.check_procedure(procedure, &context))
}

fn cmd_check_point(opts: &Options) -> Result<()> {
    if opts.positional.len() < 2 {
        bail!("Usage: scanguard-cli check-point <x> <y>");
    }
    let x: f32 = opts.positional[0].parse().context("x must be a number")?;
    let y: f32 = opts.positional[1].parse().context("y must be a number")?;

    let (zones, procedures) = opts.config.catalogs();
    let validator = SafetyValidator::new(&zones, &procedures);
    report(
        opts,
        &format!("({}, {})", x, y),
        validator.check_point(NormalizedPoint::new(x, y)),
    )
}

fn cmd_luminance(opts: &Options) -> Result<()> {
    let path = opts
        .positional
        .first()
        .context("Usage: scanguard-cli luminance <image-path>")?;
    let image = image::open(path).with_context(|| format!("opening {}", path))?;
    let frame = LuminanceFrame::from_image(&image);
    let reading = LuminanceReading::from_frame(&frame, opts.config.calibration.min_luminance);

    if opts.json {
        println!("{}", serde_json::to_string(&reading)?);
    } else {
        println!(
            "{}x{} luminance {} (minimum {}, {:.0}% ready){}",
            frame.width,
            frame.height,
            reading.value,
            reading.min_luminance,
            reading.readiness_percent,
            if reading.sufficient { "" } else { " - insufficient light" }
        );
    }
    Ok(())
}

fn cmd_print_config(opts: &Options) -> Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&opts.config)?);
    } else {
        print!("{}", toml::to_string_pretty(&opts.config)?);
    }
    Ok(())
}
