use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use field_engine::headless::FieldEvent;
use field_engine::{HeadlessField, ScriptInterpreter, ScriptSources, Session, SessionConfig};
use field_formats::{
    load_map_layout, load_script_table, load_script_tables, MapLayout, ScriptTable,
};
use serde::Serialize;

use crate::cli::{ListHooksArgs, RunArgs, TableArgs};

struct LoadedTables {
    common: ScriptTable,
    maps: BTreeMap<String, ScriptTable>,
    layouts: Vec<MapLayout>,
    map: String,
}

impl LoadedTables {
    fn load(args: &TableArgs) -> Result<Self> {
        let common = match args.common.as_ref() {
            Some(path) => load_script_table(path)
                .with_context(|| format!("loading common scripts from {}", path.display()))?,
            None => ScriptTable::default(),
        };

        let maps = if args.scripts.is_dir() {
            load_script_tables(&args.scripts)?
        } else {
            let stem = args
                .scripts
                .file_stem()
                .and_then(|stem| stem.to_str())
                .context("script table path has no usable file stem")?
                .to_string();
            BTreeMap::from([(stem, load_script_table(&args.scripts)?)])
        };

        let mut layouts = Vec::with_capacity(args.layouts.len());
        for path in &args.layouts {
            layouts.push(load_map_layout(path)?);
        }

        let map = match (args.map.as_ref(), layouts.first()) {
            (Some(map), _) => map.clone(),
            (None, Some(layout)) => layout.id.clone(),
            (None, None) => bail!("no layouts loaded"),
        };
        if !layouts.iter().any(|layout| layout.id == map) {
            bail!("--map {map} has no matching --layout");
        }
        if !maps.contains_key(&map) {
            log::warn!("no script table for {map}; only common scripts are visible");
        }

        Ok(Self {
            common,
            maps,
            layouts,
            map,
        })
    }

    fn sources(&self) -> ScriptSources {
        let mut sources = ScriptSources::new(&self.common);
        for (map, table) in &self.maps {
            sources.add_map(map, table);
        }
        sources
    }
}

#[derive(Serialize)]
struct EventLog<'a> {
    map: &'a str,
    frame: u64,
    events: &'a [FieldEvent],
}

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        tables,
        enter,
        start,
        runs,
        walk,
        idle_frames,
        answer_yes,
        choice,
        player_name,
        player_gender,
        signal_budget,
        event_log_json,
        state_json,
        debug_state_json,
    } = args;

    let loaded = LoadedTables::load(&tables)?;
    let mut field = HeadlessField::new(&player_name, player_gender);
    for layout in loaded.layouts.iter().cloned() {
        field.add_layout(layout);
    }
    let config = SessionConfig {
        answer_yes,
        choice,
        signal_budget,
        ..SessionConfig::default()
    };
    let mut session = Session::new(ScriptInterpreter::new(loaded.sources()), field, config);

    session
        .enter_map(&loaded.map, start, enter)
        .with_context(|| format!("entering {}", loaded.map))?;
    println!(
        "Entered {} at ({}, {}) via {:?}",
        loaded.map, start.x, start.y, enter
    );

    for label in &runs {
        session
            .run_script(label)
            .with_context(|| format!("running {label}"))?;
        println!("Ran {label} (frame {})", session.frame());
    }

    if !walk.is_empty() {
        session.walk(&walk).context("walking the --walk path")?;
        let pos = session.field.player().pos;
        println!("Walked to ({}, {}) (frame {})", pos.x, pos.y, session.frame());
    }
    if idle_frames > 0 {
        session
            .idle(idle_frames)
            .with_context(|| format!("idling {idle_frames} frames"))?;
    }

    let snapshot = session.snapshot();
    println!(
        "Finished on {} at ({}, {}) after {} frames, {} events, step callback {}",
        snapshot.map,
        snapshot.player.pos.x,
        snapshot.player.pos.y,
        snapshot.frame,
        session.events().len(),
        snapshot.step_callbacks.selected.name()
    );

    if let Some(path) = event_log_json.as_ref() {
        let log = EventLog {
            map: &snapshot.map,
            frame: snapshot.frame,
            events: session.events(),
        };
        write_json(path, &log, "field event log")?;
    }
    if let Some(path) = state_json.as_ref() {
        write_json(path, &session.state, "event state")?;
    }
    if let Some(path) = debug_state_json.as_ref() {
        write_json(path, &snapshot, "debug snapshot")?;
    }

    Ok(())
}

pub fn list_hooks(args: ListHooksArgs) -> Result<()> {
    let loaded = LoadedTables::load(&args.tables)?;
    let map = loaded.map.as_str();
    println!("Map {map}:");
    match loaded.maps.get(map) {
        Some(table) => {
            let header = &table.map_scripts;
            print_hook("onTransition", header.on_transition.as_deref());
            print_hook("onLoad", header.on_load.as_deref());
            for trigger in &header.on_warp_into {
                println!(
                    "  onWarpInto  {} == {} -> {}",
                    trigger.var, trigger.value, trigger.script
                );
            }
            print_hook("onResume", header.on_resume.as_deref());
            for trigger in &header.on_frame {
                println!(
                    "  onFrame     {} == {} -> {}",
                    trigger.var, trigger.value, trigger.script
                );
            }
            for label in table.hook_labels() {
                if !table.scripts.contains_key(label) && !loaded.common.scripts.contains_key(label)
                {
                    println!("  !! hook {label} is not defined");
                }
            }
            println!(
                "  {} script(s), {} movement(s), {} text(s)",
                table.scripts.len(),
                table.movements.len(),
                table.text.len()
            );
        }
        None => println!("  (no map table)"),
    }
    println!(
        "Common: {} script(s), {} movement(s), {} text(s)",
        loaded.common.scripts.len(),
        loaded.common.movements.len(),
        loaded.common.text.len()
    );
    Ok(())
}

fn print_hook(name: &str, label: Option<&str>) {
    if let Some(label) = label {
        println!("  {name:<11} {label}");
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json =
        serde_json::to_string_pretty(value).with_context(|| format!("serializing {what} to JSON"))?;
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}
