/*! Numeric values TeX computes with: integers, dimensions (in scaled points) and glue. */

use std::fmt::{Display, Formatter};

/// The number of scaled points in a point.
pub const SP_PER_PT:f64 = 65536.0;
/// Infinite stretch/shrink orders are encoded as offsets of this many scaled points
/// (`fil`: 1×, `fill`: 2×, `filll`: 3×).
pub const FIL:i64 = 2_000_000_000;
/// The largest integer TeX accepts; larger constants are clamped with a "Number too big" warning.
pub const MAX_INT:i64 = 2_147_483_647;

/// The units a [`Dim`] can be given in, in the order they are tried when reading one.
pub const UNITS:[&str;11] = ["pt","pc","in","bp","cm","mm","dd","cc","sp","ex","em"];

/// A dimension, in scaled points.
#[derive(Copy,Clone,Debug,PartialEq,Eq,PartialOrd,Ord,Default,Hash)]
pub struct Dim(pub i64);
impl Dim {
    /// The number of scaled points one `unit` represents, if `unit` is known.
    pub fn unit_factor(unit:&str) -> Option<f64> {
        Some(match unit {
            "pt" => SP_PER_PT,
            "pc" => 12.0 * SP_PER_PT,
            "in" => 72.27 * SP_PER_PT,
            "bp" => (72.27 * SP_PER_PT) / 72.0,
            "cm" => (72.27 * SP_PER_PT) / 2.54,
            "mm" => (72.27 * SP_PER_PT) / 25.4,
            "dd" => (1238.0 / 1157.0) * SP_PER_PT,
            "cc" => 12.0 * (1238.0 / 1157.0) * SP_PER_PT,
            "sp" => 1.0,
            "ex" => 5.0 * SP_PER_PT,
            "em" => 11.0 * SP_PER_PT,
            _ => return None
        })
    }
    pub fn from_unit(value:f64,unit:&str) -> Option<Dim> {
        Self::unit_factor(unit).map(|f| Dim((value * f).round() as i64))
    }
    pub fn pt(&self) -> f64 { self.0 as f64 / SP_PER_PT }
}
impl Display for Dim {
    /// Formats like TeX's `\the`: in points, with at least one decimal.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pt = self.pt();
        if pt.fract() == 0.0 { write!(f,"{:.1}pt",pt) }
        else { write!(f,"{}pt",(pt * 100000.0).round() / 100000.0) }
    }
}
impl std::ops::Add for Dim {
    type Output = Dim;
    fn add(self, rhs: Self) -> Self::Output { Dim(self.0.saturating_add(rhs.0)) }
}

/// The stretch or shrink component of a [`Skip`]: either finite or of some order of infinity.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub enum Fill {
    #[default]
    None,
    Finite(Dim),
    /// `order` ∈ `1..=3` for `fil`, `fill`, `filll`
    Fil{order:u8,factor:i64}
}
impl Fill {
    /// The encoded value in scaled points (infinite orders are offset by [`FIL`]).
    pub fn encoded(&self) -> i64 {
        match self {
            Fill::None => 0,
            Fill::Finite(d) => d.0,
            Fill::Fil{order,factor} => (FIL * (*order as i64)).saturating_add(*factor)
        }
    }
}
impl Display for Fill {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Fill::None => Ok(()),
            Fill::Finite(d) => write!(f,"{}",d),
            Fill::Fil{order,factor} => write!(f,"{}fi{}",Dim(*factor).pt(),"l".repeat(*order as usize))
        }
    }
}

/// Glue: a base dimension with optional stretch (`plus`) and shrink (`minus`).
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub struct Skip {
    pub base:Dim,
    pub stretch:Fill,
    pub shrink:Fill
}
impl Display for Skip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",self.base)?;
        if self.stretch != Fill::None { write!(f," plus {}",self.stretch)? }
        if self.shrink != Fill::None { write!(f," minus {}",self.shrink)? }
        Ok(())
    }
}

/// The value of a register allocated by `\newcount`, `\newdimen`, `\newskip` or `\newmuskip`.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum RegisterValue {
    Count(i64),
    Dimen(Dim),
    Skip(Skip),
    /// math glue, in `mu`
    MuSkip(Skip)
}
impl RegisterValue {
    /// The value coerced to an integer, as TeX does when a register is used as a number.
    pub fn as_int(&self) -> i64 {
        match self {
            RegisterValue::Count(i) => *i,
            RegisterValue::Dimen(d) => d.0,
            RegisterValue::Skip(s) | RegisterValue::MuSkip(s) => s.base.0
        }
    }
}
impl Display for RegisterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterValue::Count(i) => write!(f,"{}",i),
            RegisterValue::Dimen(d) => write!(f,"{}",d),
            RegisterValue::Skip(s) => write!(f,"{}",s),
            RegisterValue::MuSkip(s) => f.write_str(&s.to_string().replace("pt","mu"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn units() {
        assert_eq!(Dim::from_unit(1.0,"pt"),Some(Dim(65536)));
        assert_eq!(Dim::from_unit(1.0,"pc"),Some(Dim(12*65536)));
        assert_eq!(Dim::from_unit(2.0,"sp"),Some(Dim(2)));
        assert_eq!(Dim::from_unit(1.0,"furlong"),None);
        assert_eq!(Dim(65536*36).to_string(),"36.0pt");
        assert_eq!(Dim(65536*3/2).to_string(),"1.5pt");
    }
    #[test]
    fn fil() {
        let f = Fill::Fil{order:2,factor:65536};
        assert_eq!(f.encoded(),2*FIL + 65536);
        assert_eq!(f.to_string(),"1fill");
    }
}
