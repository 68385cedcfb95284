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

use strum::FromRepr;

/// MOO error values, persisted in textdumps by their integer code.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, FromRepr)]
#[allow(non_camel_case_types)]
pub enum Error {
    E_NONE = 0,
    E_TYPE = 1,
    E_DIV = 2,
    E_PERM = 3,
    E_PROPNF = 4,
    E_VERBNF = 5,
    E_VARNF = 6,
    E_INVIND = 7,
    E_RECMOVE = 8,
    E_MAXREC = 9,
    E_RANGE = 10,
    E_ARGS = 11,
    E_NARGS = 12,
    E_INVARG = 13,
    E_QUOTA = 14,
    E_FLOAT = 15,
}

impl Error {
    /// The error name as it appears in MOO source.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::E_NONE => "E_NONE",
            Self::E_TYPE => "E_TYPE",
            Self::E_DIV => "E_DIV",
            Self::E_PERM => "E_PERM",
            Self::E_PROPNF => "E_PROPNF",
            Self::E_VERBNF => "E_VERBNF",
            Self::E_VARNF => "E_VARNF",
            Self::E_INVIND => "E_INVIND",
            Self::E_RECMOVE => "E_RECMOVE",
            Self::E_MAXREC => "E_MAXREC",
            Self::E_RANGE => "E_RANGE",
            Self::E_ARGS => "E_ARGS",
            Self::E_NARGS => "E_NARGS",
            Self::E_INVARG => "E_INVARG",
            Self::E_QUOTA => "E_QUOTA",
            Self::E_FLOAT => "E_FLOAT",
        }
    }
}
