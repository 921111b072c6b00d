use super::interpreter::ScriptEnv;
use super::text::StringVars;

pub const VAR_BATTLE_OUTCOME: &str = "VAR_BATTLE_OUTCOME";

/// Runs a named special. Returns the value `specialvar` should store, if
/// the special produces one.
pub fn run_special(name: &str, env: &mut ScriptEnv<'_>, strings: &mut StringVars) -> Option<i32> {
    match name {
        "DrawWholeMapView" => {
            env.host.invalidate_view();
            None
        }
        "SetSootopolisGymCrackedIceMetatiles" => {
            let map = env.host.current_map();
            let restored = env.steps.restore_cracked_ice(&map, env.state, &mut *env.host);
            log::debug!("special.cracked_ice {map}: restored {restored} tile(s)");
            None
        }
        "GetRivalSonDaughterString" => {
            let word = if env.host.player_gender() == 0 { "daughter" } else { "son" };
            strings.insert("STR_VAR_1".to_string(), word.to_string());
            None
        }
        "GetPlayerBigGuyGirlString" => {
            let word = if env.host.player_gender() == 0 { "big guy" } else { "big girl" };
            strings.insert("STR_VAR_1".to_string(), word.to_string());
            None
        }
        "GetBattleOutcome" => Some(env.state.var_number(VAR_BATTLE_OUTCOME)),
        _ => {
            log::warn!("special.unknown {name}: skipped");
            None
        }
    }
}
