pub mod layout;
pub mod table;

pub use layout::{MapLayout, ObjectPlacement, load_map_layout};
pub use table::{
    MapScripts, RawArg, RawCommand, ScriptTable, VarTrigger, load_script_table,
    load_script_tables,
};
