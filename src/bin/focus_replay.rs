use anyhow::{anyhow, Context, Result};
use particle_focus::cli::CliOverrides;
use particle_focus::config::FocusConfig;
use particle_focus::replay::{run_replay, ReplayScript};
use particle_focus::source::SourceData;

fn run(cli: CliOverrides) -> Result<()> {
    let mut config = FocusConfig::load_or_default(cli.config_path());
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        log::info!("[config] applying command-line overrides: {overrides:?}");
        config.apply_overrides(&overrides);
    }

    let source_path = config
        .emission
        .source
        .clone()
        .ok_or_else(|| anyhow!("No emission source configured. Pass --source <data.json>."))?;
    let source = SourceData::load(&source_path)?;
    let script = match cli.script_path() {
        Some(path) => ReplayScript::load(path)?,
        None => ReplayScript::default(),
    };

    let summary = run_replay(&config, &source, &script).context("replay aborted")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            log::error!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(cli) {
        log::error!("Replay error: {err:?}");
        std::process::exit(1);
    }
}
