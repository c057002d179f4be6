//! Lua sandbox: blocks native module loading and process spawning.
//!
//! Scripts drive native objects through the bridge only. Pure Lua modules
//! and the standard string/table/math libraries stay available.

use mlua::prelude::*;

/// Apply sandbox restrictions to the Lua VM.
///
/// Currently blocks:
/// - `package.loadlib` and `package.cpath`: no .so/.dll extensions
/// - `os.execute`, `io.popen`: no child processes
pub fn apply_sandbox(lua: &Lua) -> LuaResult<()> {
    lua.load(
        r#"
        package.loadlib = nil
        package.cpath = ''
        os.execute = nil
        io.popen = nil
    "#,
    )
    .set_name("sandbox")
    .exec()
}
