//! Script `Date` API
//!
//! `Date(ms)` builds a date userdata from milliseconds since the epoch,
//! `Date()` the current time. `Date.now()` returns the current milliseconds.

use bridge_domain::Date;
use mlua::prelude::*;

/// Date value as seen by scripts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptDate(pub Date);

impl LuaUserData for ScriptDate {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getTime", |_, this, ()| Ok(this.0.millis()));
        methods.add_method_mut("setTime", |_, this, millis: i64| {
            this.0 = Date::from_millis(millis);
            Ok(())
        });
        methods.add_method("toISOString", |_, this, ()| Ok(this.0.to_string()));
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(this.0.to_string())
        });
        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaAnyUserData| {
            Ok(other
                .borrow::<ScriptDate>()
                .map(|other| other.0 == this.0)
                .unwrap_or(false))
        });
    }
}

fn millis_from(value: LuaValue) -> LuaResult<Date> {
    match value {
        LuaValue::Nil => Ok(Date::now()),
        LuaValue::Integer(millis) => Ok(Date::from_millis(millis)),
        LuaValue::Number(millis) if millis.is_finite() => Ok(Date::from_millis(millis.round() as i64)),
        LuaValue::UserData(ud) => Ok(ud.borrow::<ScriptDate>()?.0),
        other => Err(LuaError::external(format!(
            "Date expects milliseconds, got {}",
            other.type_name()
        ))),
    }
}

/// Registers the global `Date` table.
pub fn register_date_api(lua: &Lua) -> LuaResult<()> {
    let date = lua.create_table()?;
    date.set(
        "now",
        lua.create_function(|_, ()| Ok(Date::now().millis()))?,
    )?;

    let meta = lua.create_table()?;
    meta.set(
        "__call",
        lua.create_function(|_, (_date, millis): (LuaTable, LuaValue)| {
            millis_from(millis).map(ScriptDate)
        })?,
    )?;
    date.set_metatable(Some(meta));

    lua.globals().set("Date", date)
}
