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

//! Line-oriented tagged-value codec over the textdump stream. Every fallible
//! operation returns a `Result`; the dump orchestrator catches the error at
//! the top of the write sequence and converts it to a boolean, the load path
//! propagates it.

use std::io;
use std::io::{BufReader, Read, Write};

use loam_var::{
    Error, Objid, Var, VarType, Variant, v_clear, v_err, v_float, v_int, v_list, v_none, v_obj,
    v_string,
};

use crate::{Propval, Verbdef};

/// The failure signal raised by any codec read going wrong: an I/O error or
/// a line that does not parse as the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum DbioError {
    #[error("io error: {0} @ line {1}")]
    Io(io::Error, usize),
    #[error("parse error: {0} @ line {1}")]
    Parse(String, usize),
}

/// Reader half of the codec. Textdumps in the LambdaMOO lineage are
/// ISO-8859-1, so lines are consumed byte-wise rather than as UTF-8.
pub struct DbReader<R: Read> {
    reader: BufReader<R>,
    pub line_num: usize,
}

impl<R: Read> DbReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_num: 1,
        }
    }

    /// The next line, without its terminating newline.
    pub fn read_line(&mut self) -> Result<String, DbioError> {
        let mut line = String::new();
        loop {
            let mut buf = [0u8; 1];
            if let Err(e) = self.reader.read_exact(&mut buf) {
                return Err(DbioError::Io(e, self.line_num));
            }
            if buf[0] == b'\n' {
                break;
            }
            line.push(buf[0] as char);
        }
        self.line_num += 1;
        Ok(line)
    }

    pub fn read_string(&mut self) -> Result<String, DbioError> {
        let buf = self.read_line()?;
        Ok(buf.trim_end_matches('\r').to_string())
    }

    pub fn read_num(&mut self) -> Result<i64, DbioError> {
        let buf = self.read_line()?;
        let Ok(i) = buf.trim().parse() else {
            return Err(DbioError::Parse(
                format!("invalid number: {buf}"),
                self.line_num,
            ));
        };
        Ok(i)
    }

    pub fn read_objid(&mut self) -> Result<Objid, DbioError> {
        let buf = self.read_line()?;
        let Ok(i) = buf.trim().parse() else {
            return Err(DbioError::Parse(
                format!("invalid objid: {buf}"),
                self.line_num,
            ));
        };
        Ok(Objid(i))
    }

    pub fn read_float(&mut self) -> Result<f64, DbioError> {
        let buf = self.read_line()?;
        let Ok(f) = buf.trim().parse() else {
            return Err(DbioError::Parse(
                format!("invalid float: {buf}"),
                self.line_num,
            ));
        };
        Ok(f)
    }

    /// A line of whitespace-separated numbers, of which there must be exactly
    /// `expected_count`.
    pub fn read_number_line(&mut self, expected_count: usize) -> Result<Vec<i64>, DbioError> {
        let line = self.read_string()?;
        let mut numbers = Vec::with_capacity(expected_count);
        for n in line.split_whitespace() {
            let n = n
                .parse::<i64>()
                .map_err(|e| DbioError::Parse(format!("invalid number: {e}"), self.line_num))?;
            numbers.push(n);
        }
        if numbers.len() != expected_count {
            return Err(DbioError::Parse(
                format!("expected {} numbers, got {}", expected_count, numbers.len()),
                self.line_num,
            ));
        }
        Ok(numbers)
    }

    /// A compound Var: one line of type tag, then the tag-specific payload.
    pub fn read_var(&mut self) -> Result<Var, DbioError> {
        let t_num = self.read_num()?;
        let Some(vtype) = VarType::from_repr(t_num as u8) else {
            return Err(DbioError::Parse(
                format!("invalid var type: {t_num}"),
                self.line_num,
            ));
        };
        let v = match vtype {
            VarType::TYPE_INT => v_int(self.read_num()?),
            VarType::TYPE_OBJ => v_obj(self.read_objid()?),
            VarType::TYPE_STR => v_string(self.read_string()?),
            VarType::TYPE_ERR => {
                let e_num = self.read_num()?;
                let Some(e) = Error::from_repr(e_num as u8) else {
                    return Err(DbioError::Parse(
                        format!("invalid error code: {e_num}"),
                        self.line_num,
                    ));
                };
                v_err(e)
            }
            VarType::TYPE_LIST => {
                let l_size = self.read_num()?;
                let mut v = Vec::with_capacity(l_size.max(0) as usize);
                for _ in 0..l_size {
                    v.push(self.read_var()?);
                }
                v_list(v)
            }
            VarType::TYPE_CLEAR => v_clear(),
            VarType::TYPE_NONE => v_none(),
            // Labels appear only inside suspended-task frames; carried as ints.
            VarType::TYPE_LABEL => v_int(self.read_num()?),
            VarType::TYPE_FLOAT => v_float(self.read_float()?),
        };
        Ok(v)
    }

    pub fn read_verbdef(&mut self) -> Result<Verbdef, DbioError> {
        let name = self.read_string()?;
        let owner = self.read_objid()?;
        let perms = self.read_num()? as u16;
        let prep = self.read_num()? as i16;
        Ok(Verbdef {
            name,
            owner,
            perms,
            prep,
            program: None,
        })
    }

    pub fn read_propdef(&mut self) -> Result<String, DbioError> {
        self.read_string()
    }

    pub fn read_propval(&mut self) -> Result<Propval, DbioError> {
        Ok(Propval {
            var: self.read_var()?,
            owner: self.read_objid()?,
            perms: self.read_num()? as u8,
        })
    }
}

/// Writer half of the codec. Errors are plain `io::Error`; the snapshot
/// writer converts them to a failed-dump verdict at its catch point.
pub struct DbWriter<W: Write> {
    writer: W,
}

impl<W: Write> DbWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), io::Error> {
        writeln!(self.writer, "{line}")
    }

    pub fn write_num(&mut self, n: i64) -> Result<(), io::Error> {
        writeln!(self.writer, "{n}")
    }

    pub fn write_objid(&mut self, oid: Objid) -> Result<(), io::Error> {
        writeln!(self.writer, "{}", oid.0)
    }

    pub fn write_float(&mut self, f: f64) -> Result<(), io::Error> {
        writeln!(self.writer, "{f:+e}")
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), io::Error> {
        let encoded = encoding_rs::WINDOWS_1252.encode(s);
        self.writer.write_all(&encoded.0)?;
        writeln!(self.writer)
    }

    pub fn write_var(&mut self, var: &Var) -> Result<(), io::Error> {
        self.write_num(var.type_code() as i64)?;
        match var.variant() {
            Variant::Int(i) => self.write_num(*i)?,
            Variant::Obj(o) => self.write_objid(*o)?,
            Variant::Str(s) => self.write_string(s)?,
            Variant::Err(e) => self.write_num(*e as i64)?,
            Variant::List(l) => {
                self.write_num(l.len() as i64)?;
                for v in l.iter() {
                    self.write_var(v)?;
                }
            }
            // Tag-only types carry no payload.
            Variant::Clear | Variant::None => {}
            Variant::Float(f) => self.write_float(*f)?,
        }
        Ok(())
    }

    pub fn write_verbdef(&mut self, v: &Verbdef) -> Result<(), io::Error> {
        self.write_string(&v.name)?;
        self.write_objid(v.owner)?;
        self.write_num(v.perms as i64)?;
        self.write_num(v.prep as i64)
    }

    pub fn write_propdef(&mut self, name: &str) -> Result<(), io::Error> {
        self.write_string(name)
    }

    pub fn write_propval(&mut self, p: &Propval) -> Result<(), io::Error> {
        self.write_var(&p.var)?;
        self.write_objid(p.owner)?;
        self.write_num(p.perms as i64)
    }
}

#[cfg(test)]
mod tests {
    use loam_var::{Error, Objid, v_err, v_float, v_int, v_list, v_obj, v_str};

    use super::{DbReader, DbWriter};

    fn round_trip(v: &loam_var::Var) -> loam_var::Var {
        let mut out = Vec::new();
        DbWriter::new(&mut out).write_var(v).unwrap();
        DbReader::new(out.as_slice()).read_var().unwrap()
    }

    #[test]
    fn var_codec_round_trips_compound_values() {
        let v = v_list(vec![
            v_int(42),
            v_obj(Objid(-1)),
            v_str("hello, there"),
            v_err(Error::E_RANGE),
            v_list(vec![v_float(1.5)]),
        ]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn reader_counts_lines_for_diagnostics() {
        let mut r = DbReader::new("1\nbogus\n".as_bytes());
        assert_eq!(r.read_num().unwrap(), 1);
        let err = r.read_num().unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn strings_survive_latin1() {
        let mut out = Vec::new();
        DbWriter::new(&mut out).write_string("caf\u{e9}").unwrap();
        assert_eq!(out, b"caf\xe9\n");
        let s = DbReader::new(out.as_slice()).read_string().unwrap();
        assert_eq!(s, "caf\u{e9}");
    }
}
