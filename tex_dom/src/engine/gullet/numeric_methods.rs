//! Reading numbers, dimensions and glue from the input, expanding macros on the way.
//!
//! Malformed quantities are not errors: TeX inserts `0` (or `pt`) and continues, and so do we,
//! with a warning.

use log::{trace, warn};
use crate::commands::{PrimitiveCommand, TeXCommand};
use crate::engine::Engine;
use crate::tex::catcodes::CategoryCode;
use crate::tex::numerics::{Dim, Fill, MAX_INT, RegisterValue, Skip, SP_PER_PT, UNITS};
use crate::tex::tokens::{Token, ACTIVE_PREFIX};
use crate::utils::errors::TeXResult;
use crate::file_end;

fn digit(tk:&Token,radix:u32) -> Option<u32> {
    if !matches!(tk.catcode,CategoryCode::Other | CategoryCode::Letter) || tk.text.len() != 1 { return None }
    let c = tk.char()?;
    if radix == 16 && c.is_ascii_lowercase() { return None }
    c.to_digit(radix)
}

fn missing_number(engine:&mut Engine,tk:Option<Token>) -> i64 {
    warn!(target:"numbers","Missing number, treated as zero{}",
        tk.as_ref().map(|t| format!(" (found {})",t)).unwrap_or_default());
    if let Some(tk) = tk { engine.requeue(tk) }
    0
}

/// Reads an integer: optional signs, then a decimal, octal (`'`), hexadecimal (`"`) or character
/// (`` ` ``) constant, or an internal quantity (a register, `\chardef` or `\catcode`).
pub fn read_int(engine:&mut Engine) -> TeXResult<i64> {
    let mut negative = false;
    let sign = |neg:bool,i:i64| if neg { i.saturating_neg() } else { i };
    loop {
        let Some((tk,cmd)) = engine.next_unexpandable()? else { return Ok(missing_number(engine,None)) };
        match cmd {
            Some(TeXCommand::Register(name)) => {
                let v = engine.state.register(&name).map(|r| r.as_int()).unwrap_or(0);
                return Ok(sign(negative,v))
            }
            Some(TeXCommand::CharDef(c) | TeXCommand::MathCharDef(c)) => return Ok(sign(negative,c as i64)),
            Some(TeXCommand::Primitive{name:"catcode",..}) => {
                let c = read_int(engine)?;
                let code = char::from_u32(c as u32).map(|c| engine.state.which_code(c)).unwrap_or_default();
                return Ok(sign(negative,u8::from(code) as i64))
            }
            Some(_) => return Ok(missing_number(engine,Some(tk))),
            None => ()
        }
        if tk.catcode == CategoryCode::Space { continue }
        if tk.catcode != CategoryCode::Other {
            return Ok(missing_number(engine,Some(tk)))
        }
        match &*tk.text {
            "-" => negative = !negative,
            "+" => (),
            "'" => return read_radix(engine,8,None,negative),
            "\"" => return read_radix(engine,16,None,negative),
            "`" => {
                let Some(t) = engine.get_next_raw() else { file_end!() };
                let c = if t.is_cs() {
                    let name = t.text.strip_prefix(ACTIVE_PREFIX).unwrap_or(&t.text);
                    let mut chars = name.chars();
                    match (chars.next(),chars.next()) {
                        (Some(c),None) => c,
                        _ => {
                            warn!(target:"numbers","Improper alphabetic constant \\{}",t.text);
                            '0'
                        }
                    }
                } else {
                    t.char().unwrap_or('0')
                };
                engine.skip_one_space()?;
                return Ok(sign(negative,c as i64))
            }
            _ => match digit(&tk,10) {
                Some(d) => return read_radix(engine,10,Some(d),negative),
                None => return Ok(missing_number(engine,Some(tk)))
            }
        }
    }
}

fn read_radix(engine:&mut Engine,radix:u32,first:Option<u32>,negative:bool) -> TeXResult<i64> {
    let mut ret:i64 = first.map(|d| d as i64).unwrap_or(0);
    let mut any = first.is_some();
    while let Some((tk,cmd)) = engine.next_unexpandable()? {
        match (cmd,digit(&tk,radix)) {
            (None,Some(d)) => {
                any = true;
                ret = ret.saturating_mul(radix as i64).saturating_add(d as i64);
            }
            (None,_) if tk.catcode == CategoryCode::Space => break,
            _ => {
                engine.requeue(tk);
                break
            }
        }
    }
    if !any { warn!(target:"numbers","Missing digits after radix prefix") }
    if ret > MAX_INT {
        warn!(target:"numbers","Number too big: {} replaced by {}",ret,MAX_INT);
        ret = MAX_INT
    }
    trace!(target:"numbers","Read {}",ret);
    Ok(if negative { ret.saturating_neg() } else { ret })
}

/// Reads the digits of a decimal number, with `.` or `,` as decimal separator; the first
/// character has been read already.
fn read_decimal(engine:&mut Engine,first:&str) -> TeXResult<f64> {
    let mut s = first.replace(',',".");
    while let Some((tk,cmd)) = engine.next_unexpandable()? {
        match (cmd,tk.catcode) {
            (None,CategoryCode::Other) if digit(&tk,10).is_some() => s.push_str(&tk.text),
            (None,CategoryCode::Other) if (&*tk.text == "." || &*tk.text == ",") && !s.contains('.') => s.push('.'),
            (None,CategoryCode::Space) => break,
            _ => {
                engine.requeue(tk);
                break
            }
        }
    }
    Ok(s.parse::<f64>().unwrap_or(0.0))
}

/// Reads a decimal number, possibly with a fractional part.
pub fn read_float(engine:&mut Engine) -> TeXResult<f64> {
    let mut negative = false;
    loop {
        let Some((tk,cmd)) = engine.next_unexpandable()? else { return Ok(missing_number(engine,None) as f64) };
        match cmd {
            Some(TeXCommand::Register(name)) => {
                let v = engine.state.register(&name).map(|r| r.as_int()).unwrap_or(0) as f64;
                return Ok(if negative { -v } else { v })
            }
            Some(_) => return Ok(missing_number(engine,Some(tk)) as f64),
            None => ()
        }
        match (tk.catcode,&*tk.text) {
            (CategoryCode::Space,_) => (),
            (CategoryCode::Other,"-") => negative = !negative,
            (CategoryCode::Other,"+") => (),
            (CategoryCode::Other,s) if s == "." || s == "," || digit(&tk,10).is_some() => {
                let f = read_decimal(engine,s)?;
                return Ok(if negative { -f } else { f })
            }
            _ => return Ok(missing_number(engine,Some(tk)) as f64)
        }
    }
}

enum Factor { Number(f64), Dim(Dim) }

/// The part of a dimension before its unit: a number, or an internal dimension.
fn read_factor(engine:&mut Engine) -> TeXResult<Factor> {
    let mut negative = false;
    let sign = |neg:bool,f:f64| if neg { -f } else { f };
    loop {
        let Some((tk,cmd)) = engine.next_unexpandable()? else { return Ok(Factor::Number(missing_number(engine,None) as f64)) };
        match cmd {
            Some(TeXCommand::Register(name)) => return Ok(match engine.state.register(&name) {
                Some(RegisterValue::Dimen(d)) => Factor::Dim(if negative { Dim(d.0.saturating_neg()) } else { d }),
                Some(RegisterValue::Skip(s) | RegisterValue::MuSkip(s)) => Factor::Dim(if negative { Dim(s.base.0.saturating_neg()) } else { s.base }),
                Some(RegisterValue::Count(i)) => Factor::Number(sign(negative,i as f64)),
                None => Factor::Number(0.0)
            }),
            Some(TeXCommand::CharDef(c) | TeXCommand::MathCharDef(c)) => return Ok(Factor::Number(sign(negative,c as u32 as f64))),
            Some(TeXCommand::Primitive{cmd:PrimitiveCommand::Unexpandable(_),name:"catcode"}) => {
                engine.requeue(tk);
                let i = read_int(engine)?;
                return Ok(Factor::Number(sign(negative,i as f64)))
            }
            Some(_) => return Ok(Factor::Number(missing_number(engine,Some(tk)) as f64)),
            None => ()
        }
        match (tk.catcode,&*tk.text) {
            (CategoryCode::Space,_) => (),
            (CategoryCode::Other,"-") => negative = !negative,
            (CategoryCode::Other,"+") => (),
            (CategoryCode::Other,"'" | "\"" | "`") => {
                engine.requeue(tk);
                let i = read_int(engine)?;
                return Ok(Factor::Number(sign(negative,i as f64)))
            }
            (CategoryCode::Other,s) if s == "." || s == "," || digit(&tk,10).is_some() => {
                let f = read_decimal(engine,s)?;
                return Ok(Factor::Number(sign(negative,f)))
            }
            _ => return Ok(Factor::Number(missing_number(engine,Some(tk)) as f64))
        }
    }
}

/// Reads the unit of a dimension whose factor is `factor`.
fn read_unit(engine:&mut Engine,factor:f64,mu:bool) -> TeXResult<Dim> {
    if mu {
        if !engine.read_keyword("mu")? {
            warn!(target:"numbers","Illegal unit of measure (mu inserted)");
        }
        return Ok(Dim((factor * SP_PER_PT).round() as i64))
    }
    engine.read_keyword("true")?;
    for u in UNITS {
        if engine.read_keyword(u)? {
            return Ok(Dim::from_unit(factor,u).unwrap_or_default())
        }
    }
    if let Some((tk,cmd)) = engine.next_unexpandable()? {
        if let Some(TeXCommand::Register(name)) = &cmd {
            match engine.state.register(name) {
                Some(RegisterValue::Dimen(d)) => return Ok(Dim((factor * d.0 as f64).round() as i64)),
                Some(RegisterValue::Skip(s)) => return Ok(Dim((factor * s.base.0 as f64).round() as i64)),
                _ => ()
            }
        }
        engine.requeue(tk);
    }
    warn!(target:"numbers","Illegal unit of measure (pt inserted)");
    Ok(Dim::from_unit(factor,"pt").unwrap_or_default())
}

/// Reads a dimension.
pub fn read_dim(engine:&mut Engine) -> TeXResult<Dim> {
    match read_factor(engine)? {
        Factor::Dim(d) => Ok(d),
        Factor::Number(f) => read_unit(engine,f,false)
    }
}
/// Reads a math dimension (in `mu`).
pub fn read_mudim(engine:&mut Engine) -> TeXResult<Dim> {
    match read_factor(engine)? {
        Factor::Dim(d) => Ok(d),
        Factor::Number(f) => read_unit(engine,f,true)
    }
}

/// Reads the stretch or shrink component of glue: a dimension or `fil`, `fill`, `filll`.
pub fn read_fill(engine:&mut Engine,mu:bool) -> TeXResult<Fill> {
    match read_factor(engine)? {
        Factor::Dim(d) => Ok(Fill::Finite(d)),
        Factor::Number(f) => {
            for (order,kw) in [(3u8,"filll"),(2,"fill"),(1,"fil")] {
                if engine.read_keyword(kw)? {
                    return Ok(Fill::Fil{order,factor:(f * SP_PER_PT).round() as i64})
                }
            }
            Ok(Fill::Finite(read_unit(engine,f,mu)?))
        }
    }
}

fn read_glue(engine:&mut Engine,mu:bool) -> TeXResult<Skip> {
    engine.skip_whitespace_expanded()?;
    if let Some((tk,cmd)) = engine.next_unexpandable()? {
        if let Some(TeXCommand::Register(name)) = &cmd {
            match engine.state.register(name) {
                Some(RegisterValue::Skip(s)) if !mu => return Ok(s),
                Some(RegisterValue::MuSkip(s)) if mu => return Ok(s),
                _ => ()
            }
        }
        engine.requeue(tk);
    }
    let base = if mu { read_mudim(engine)? } else { read_dim(engine)? };
    let stretch = if engine.read_keyword("plus")? { read_fill(engine,mu)? } else { Fill::None };
    let shrink = if engine.read_keyword("minus")? { read_fill(engine,mu)? } else { Fill::None };
    Ok(Skip{base,stretch,shrink})
}
/// Reads glue: `<dimen> [plus <fill>] [minus <fill>]`.
pub fn read_skip(engine:&mut Engine) -> TeXResult<Skip> { read_glue(engine,false) }
/// Reads math glue.
pub fn read_muskip(engine:&mut Engine) -> TeXResult<Skip> { read_glue(engine,true) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::numerics::FIL;

    fn engine(s:&str) -> Engine {
        let mut e = Engine::default();
        e.mouth.push_string(s,"<string>");
        e
    }

    #[test]
    fn integers() {
        let mut e = engine("42 -'17 \"1F `a `\\b --+7x");
        assert_eq!(read_int(&mut e).unwrap(),42);
        assert_eq!(read_int(&mut e).unwrap(),-15);
        assert_eq!(read_int(&mut e).unwrap(),31);
        assert_eq!(read_int(&mut e).unwrap(),97);
        assert_eq!(read_int(&mut e).unwrap(),98);
        assert_eq!(read_int(&mut e).unwrap(),7);
        assert_eq!(e.get_next_raw(),Some(Token::letter('x')));
    }

    #[test]
    fn too_big() {
        let mut e = engine("99999999999999999999 -99999999999999999999 2147483647 \"FFFFFFFF x");
        assert_eq!(read_int(&mut e).unwrap(),MAX_INT);
        assert_eq!(read_int(&mut e).unwrap(),-MAX_INT);
        assert_eq!(read_int(&mut e).unwrap(),MAX_INT);
        assert_eq!(read_int(&mut e).unwrap(),MAX_INT);
        assert_eq!(e.get_next_raw(),Some(Token::letter('x')));
    }

    #[test]
    fn missing() {
        let mut e = engine("x");
        assert_eq!(read_int(&mut e).unwrap(),0);
        assert_eq!(e.get_next_raw(),Some(Token::letter('x')));
    }

    #[test]
    fn dimensions() {
        let mut e = engine("36 pt 1.5pt -,5pt 1in 3 true cm 2ex");
        assert_eq!(read_dim(&mut e).unwrap(),Dim(36 * 65536));
        assert_eq!(read_dim(&mut e).unwrap(),Dim(3 * 65536 / 2));
        assert_eq!(read_dim(&mut e).unwrap(),Dim(-65536 / 2));
        assert_eq!(read_dim(&mut e).unwrap(),Dim::from_unit(1.0,"in").unwrap());
        assert_eq!(read_dim(&mut e).unwrap(),Dim::from_unit(3.0,"cm").unwrap());
        assert_eq!(read_dim(&mut e).unwrap(),Dim(10 * 65536));
    }

    #[test]
    fn glue() {
        let mut e = engine("1pt plus 2fill minus 3pt 5pt x");
        let s = read_skip(&mut e).unwrap();
        assert_eq!(s.base,Dim(65536));
        assert_eq!(s.stretch,Fill::Fil{order:2,factor:2 * 65536});
        assert_eq!(s.stretch.encoded(),2 * FIL + 2 * 65536);
        assert_eq!(s.shrink,Fill::Finite(Dim(3 * 65536)));
        let s = read_skip(&mut e).unwrap();
        assert_eq!(s,Skip{base:Dim(5 * 65536),stretch:Fill::None,shrink:Fill::None});
        assert_eq!(e.get_next_raw(),Some(Token::letter('x')));
    }

    #[test]
    fn registers() {
        let mut e = Engine::default();
        e.state.new_register("foo",RegisterValue::Dimen(Dim(65536)));
        e.state.new_register("n",RegisterValue::Count(3));
        e.mouth.push_string("\\foo 2\\foo \\n","<string>");
        assert_eq!(read_dim(&mut e).unwrap(),Dim(65536));
        assert_eq!(read_dim(&mut e).unwrap(),Dim(2 * 65536));
        assert_eq!(read_int(&mut e).unwrap(),3);
    }
}
