use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use field_engine::host::TilePos;
use field_engine::MapEntryKind;

#[derive(Parser, Debug)]
#[command(
    about = "Headless driver for overworld event scripts and step callbacks",
    version
)]
pub struct Args {
    /// Map script table JSON, or a directory of tables keyed by map id (file stem)
    #[arg(long)]
    pub scripts: PathBuf,

    /// Script table shared by every map
    #[arg(long)]
    pub common: Option<PathBuf>,

    /// Map layout JSON to load (repeatable)
    #[arg(long = "layout", value_name = "PATH")]
    pub layouts: Vec<PathBuf>,

    /// Map to enter before running anything (default: first layout)
    #[arg(long)]
    pub map: Option<String>,

    /// How the map is entered, which decides the hook scripts that run
    #[arg(long, value_enum, default_value_t = MapEntryKind::Warp)]
    pub enter: MapEntryKind,

    /// Player start tile as "x,y"
    #[arg(long, value_parser = parse_tile_pos, default_value = "0,0")]
    pub start: TilePos,

    /// Script label to run after entering the map (repeatable, runs in order)
    #[arg(long = "run", value_name = "LABEL")]
    pub runs: Vec<String>,

    /// Waypoints to walk after the scripts, e.g. "3,6 3,9"
    #[arg(long)]
    pub walk: Option<String>,

    /// Frames to idle after walking
    #[arg(long, default_value_t = 0)]
    pub idle_frames: u32,

    /// Answer every yes/no prompt with yes (default)
    #[arg(long)]
    pub answer_yes: bool,

    /// Answer every yes/no prompt with no
    #[arg(long)]
    pub answer_no: bool,

    /// Menu index picked at choice prompts (default: 0)
    #[arg(long)]
    pub choice: Option<u16>,

    /// Back out of cancelable choice prompts instead of picking an entry
    #[arg(long)]
    pub cancel_choices: bool,

    /// Player name used for {PLAYER}
    #[arg(long, default_value = "BRENDAN")]
    pub player_name: String,

    /// Play as the female character
    #[arg(long)]
    pub female: bool,

    /// Signals a script may consume before it counts as stalled
    #[arg(long, default_value_t = 100_000)]
    pub signal_budget: usize,

    /// Path to write the field event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the final flag/variable store as JSON
    #[arg(long)]
    pub state_json: Option<PathBuf>,

    /// Path to write the session debug snapshot as JSON
    #[arg(long)]
    pub debug_state_json: Option<PathBuf>,

    /// List the script labels visible on the entered map and exit
    #[arg(long)]
    pub list_hooks: bool,

    /// Raise the log filter to debug
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Command {
    Run(RunArgs),
    ListHooks(ListHooksArgs),
}

#[derive(Debug)]
pub struct TableArgs {
    pub scripts: PathBuf,
    pub common: Option<PathBuf>,
    pub layouts: Vec<PathBuf>,
    pub map: Option<String>,
}

#[derive(Debug)]
pub struct RunArgs {
    pub tables: TableArgs,
    pub enter: MapEntryKind,
    pub start: TilePos,
    pub runs: Vec<String>,
    pub walk: Vec<TilePos>,
    pub idle_frames: u32,
    pub answer_yes: bool,
    pub choice: Option<u16>,
    pub player_name: String,
    pub player_gender: i32,
    pub signal_budget: usize,
    pub event_log_json: Option<PathBuf>,
    pub state_json: Option<PathBuf>,
    pub debug_state_json: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ListHooksArgs {
    pub tables: TableArgs,
}

pub fn parse() -> Result<(Command, bool)> {
    let args = Args::parse();
    let verbose = args.verbose;
    Ok((args.into_command()?, verbose))
}

impl Args {
    fn into_command(self) -> Result<Command> {
        if self.answer_yes && self.answer_no {
            bail!("--answer-yes and --answer-no are mutually exclusive");
        }
        if self.cancel_choices && self.choice.is_some() {
            bail!("--choice cannot be combined with --cancel-choices");
        }
        if self.layouts.is_empty() {
            bail!("at least one --layout is required");
        }
        if self.signal_budget == 0 {
            bail!("--signal-budget must be positive");
        }

        let tables = TableArgs {
            scripts: self.scripts,
            common: self.common,
            layouts: self.layouts,
            map: self.map,
        };

        if self.list_hooks {
            if !self.runs.is_empty() || self.walk.is_some() {
                bail!("--list-hooks cannot be combined with --run or --walk");
            }
            return Ok(Command::ListHooks(ListHooksArgs { tables }));
        }

        let walk = match self.walk.as_deref() {
            Some(path) => parse_walk(path)?,
            None => Vec::new(),
        };
        let choice = if self.cancel_choices {
            None
        } else {
            Some(self.choice.unwrap_or(0))
        };

        Ok(Command::Run(RunArgs {
            tables,
            enter: self.enter,
            start: self.start,
            runs: self.runs,
            walk,
            idle_frames: self.idle_frames,
            answer_yes: !self.answer_no,
            choice,
            player_name: self.player_name,
            player_gender: i32::from(self.female),
            signal_budget: self.signal_budget,
            event_log_json: self.event_log_json,
            state_json: self.state_json,
            debug_state_json: self.debug_state_json,
        }))
    }
}

fn parse_tile_pos(text: &str) -> Result<TilePos, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {text:?}"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("bad x in {text:?}: {err}"))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("bad y in {text:?}: {err}"))?;
    Ok(TilePos::new(x, y))
}

fn parse_walk(path: &str) -> Result<Vec<TilePos>> {
    path.split_whitespace()
        .map(|point| {
            parse_tile_pos(point)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("parsing --walk {path:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec![
            "field_engine",
            "--scripts",
            "scripts",
            "--layout",
            "gym.json",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn defaults_answer_yes_and_pick_the_first_choice() {
        let Command::Run(run) = args(&[]).into_command().expect("valid") else {
            panic!("expected a run command");
        };
        assert!(run.answer_yes);
        assert_eq!(run.choice, Some(0));
        assert_eq!(run.start, TilePos::new(0, 0));
        assert_eq!(run.enter, MapEntryKind::Warp);
        assert_eq!(run.player_gender, 0);
    }

    #[test]
    fn walk_and_start_parse_into_tiles() {
        let Command::Run(run) = args(&["--start", "3,5", "--walk", "3,6  4,6"])
            .into_command()
            .expect("valid")
        else {
            panic!("expected a run command");
        };
        assert_eq!(run.start, TilePos::new(3, 5));
        assert_eq!(run.walk, vec![TilePos::new(3, 6), TilePos::new(4, 6)]);
        assert!(args(&["--walk", "3;6"]).into_command().is_err());
    }

    #[test]
    fn contradictory_options_are_rejected() {
        assert!(args(&["--answer-yes", "--answer-no"]).into_command().is_err());
        assert!(args(&["--choice", "2", "--cancel-choices"])
            .into_command()
            .is_err());
        assert!(args(&["--list-hooks", "--run", "Gym_Exit"])
            .into_command()
            .is_err());
        assert!(Args::try_parse_from(["field_engine", "--scripts", "s"])
            .expect("arguments parse")
            .into_command()
            .is_err());
    }
}
