use odoo_contact_sync::config::ConfigFile;
use odoo_contact_sync::storage::{default_db_path, SqliteContactStore};
use odoo_contact_sync::{job, logging};
use std::process::ExitCode;

const USAGE: &str = "usage: odoo-contact-sync [sync | list [QUERY]]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let file = ConfigFile::load();

    let (level, log_dir) = match &file {
        Ok(f) => (f.log_level.clone().unwrap_or_else(|| "info".to_string()), f.log_dir.clone()),
        Err(_) => ("info".to_string(), None),
    };
    if let Err(err) = logging::init_logging(&level, log_dir.as_deref()) {
        // An unusable log_dir still leaves stderr.
        eprintln!("file logging disabled: {err}");
        if let Err(err) = logging::init_logging(&level, None) {
            eprintln!("logging disabled: {err}");
        }
    }

    match args.first().map(String::as_str) {
        None | Some("sync") => {
            // Failures are logged by the job; the scheduler only sees a clean exit.
            job::trigger_with(file);
            ExitCode::SUCCESS
        }
        Some("list") => {
            let query = args.get(1).map(String::as_str);
            let path = file.ok().and_then(|f| f.db_path).or_else(default_db_path);
            match list(path, query) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("{err}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(_) => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    }
}

fn list(path: Option<std::path::PathBuf>, query: Option<&str>) -> Result<(), String> {
    let path = path.ok_or("no db_path configured and no platform data dir")?;
    let store = SqliteContactStore::open(&path).map_err(|e| e.to_string())?;
    let contacts = store.list(query, None).map_err(|e| e.to_string())?;
    for c in &contacts {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            c.external_id,
            c.name,
            c.email.as_deref().unwrap_or("-"),
            c.phone.as_deref().unwrap_or("-"),
            c.last_synced_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    let total = store.count().map_err(|e| e.to_string())?;
    eprintln!("{} of {total} contact(s)", contacts.len());
    Ok(())
}
