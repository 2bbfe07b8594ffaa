//! Demo: `careflow-demo [plantilla.json] [contexto.json]`.
//!
//! Sin argumentos construye la plantilla de triaje de ejemplo y usa un
//! contexto vacío.
use std::path::Path;
use std::process::ExitCode;

use careflow::config::{init_dotenv, init_logging, AppConfig};
use careflow::demo::{load_context, load_template, run_to_completion, sample_template};
use careflow::errors::CoreError;
use careflow_core::{order_steps, InstanceContext};

fn run(config: &AppConfig) -> Result<(), CoreError> {
    let mut args = std::env::args().skip(1);
    let template = match args.next() {
        Some(path) => load_template(Path::new(&path))?,
        None => sample_template(config.max_history)?,
    };
    let ctx = match args.next() {
        Some(path) => load_context(Path::new(&path))?,
        None => InstanceContext::new(),
    };

    let ordered = order_steps(&template.graph)?;
    for entry in ordered.iter() {
        let name = template.graph.step(entry.step_id.as_str()).map(|s| s.name.as_str()).unwrap_or("?");
        println!("{:>2}. {} ({})", entry.index, name, entry.step_id);
    }

    let run = run_to_completion(template, &ctx)?;
    for (i, p) in run.snapshots.iter().enumerate() {
        println!("[{i}] {}/{} completados ({:.0}%), step #{}, ~{} días restantes",
                 p.completed, p.total, p.percent, p.current_index, p.est_days_remaining);
    }
    println!("instancia {} finalizada con {} override(s)", run.instance.id, run.overrides);
    Ok(())
}

fn main() -> ExitCode {
    init_dotenv();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_logging(&AppConfig::default());
            log::error!("{err}");
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
