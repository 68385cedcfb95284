// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

pub use crate::error::Error;
pub use crate::list::List;
pub use crate::objid::{NOTHING, Objid, SYSTEM_OBJECT};
pub use crate::variant::Variant;

mod error;
mod list;
mod objid;
mod variant;

use std::fmt::{Debug, Display, Formatter};

use strum::FromRepr;

/// Integer encoding of values as represented in a LambdaMOO textdump, and by
/// the `typeof()` builtin.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromRepr)]
#[allow(non_camel_case_types)]
pub enum VarType {
    TYPE_INT = 0,
    TYPE_OBJ = 1,
    TYPE_STR = 2,
    TYPE_ERR = 3,
    TYPE_LIST = 4,
    /// In "clear" (inherited) property value slots.
    TYPE_CLEAR = 5,
    /// In uninitialized MOO variables.
    TYPE_NONE = 6,
    /// Present only in textdumps, inside suspended-task frames.
    TYPE_LABEL = 7,
    TYPE_FLOAT = 9,
}

/// Var is our variant type / tagged union used to represent the world's
/// dynamically typed values.
#[derive(Clone, PartialEq)]
pub struct Var {
    value: Variant,
}

impl Var {
    #[must_use]
    pub fn new(value: Variant) -> Self {
        Self { value }
    }

    #[must_use]
    pub fn variant(&self) -> &Variant {
        &self.value
    }

    #[must_use]
    pub fn type_code(&self) -> VarType {
        match self.value {
            Variant::Int(_) => VarType::TYPE_INT,
            Variant::Obj(_) => VarType::TYPE_OBJ,
            Variant::Str(_) => VarType::TYPE_STR,
            Variant::Err(_) => VarType::TYPE_ERR,
            Variant::List(_) => VarType::TYPE_LIST,
            Variant::Clear => VarType::TYPE_CLEAR,
            Variant::None => VarType::TYPE_NONE,
            Variant::Float(_) => VarType::TYPE_FLOAT,
        }
    }

    /// The object this Var names, if it is a scalar object reference.
    #[must_use]
    pub fn as_objid(&self) -> Option<Objid> {
        match self.value {
            Variant::Obj(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&List> {
        match &self.value {
            Variant::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_clear(&self) -> bool {
        matches!(self.value, Variant::Clear)
    }

    #[must_use]
    pub fn to_literal(&self) -> String {
        match &self.value {
            Variant::Clear => String::from("<clear>"),
            Variant::None => String::from("<none>"),
            Variant::Int(i) => i.to_string(),
            Variant::Obj(o) => o.to_literal(),
            Variant::Float(f) => format!("{f:+e}"),
            Variant::Str(s) => format!("\"{s}\""),
            Variant::Err(e) => format!("{e:?}"),
            Variant::List(l) => {
                let elements: Vec<String> = l.iter().map(Self::to_literal).collect();
                format!("{{{}}}", elements.join(", "))
            }
        }
    }
}

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_literal())
    }
}

#[must_use]
pub fn v_int(i: i64) -> Var {
    Var::new(Variant::Int(i))
}

#[must_use]
pub fn v_float(f: f64) -> Var {
    Var::new(Variant::Float(f))
}

#[must_use]
pub fn v_str(s: &str) -> Var {
    Var::new(Variant::Str(s.to_string()))
}

#[must_use]
pub fn v_string(s: String) -> Var {
    Var::new(Variant::Str(s))
}

#[must_use]
pub fn v_obj(o: Objid) -> Var {
    Var::new(Variant::Obj(o))
}

#[must_use]
pub fn v_err(e: Error) -> Var {
    Var::new(Variant::Err(e))
}

#[must_use]
pub fn v_list(l: Vec<Var>) -> Var {
    Var::new(Variant::List(List::from_vec(l)))
}

#[must_use]
pub fn v_empty_list() -> Var {
    Var::new(Variant::List(List::new()))
}

#[must_use]
pub fn v_none() -> Var {
    Var::new(Variant::None)
}

#[must_use]
pub fn v_clear() -> Var {
    Var::new(Variant::Clear)
}
