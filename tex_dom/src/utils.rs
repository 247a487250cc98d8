/*! Utility methods and data structures.*/

use lazy_static::lazy_static;
use std::path::PathBuf;
use std::rc::Rc;

pub mod errors;

/// A [`HashMap`](std::collections::HashMap) with [`rustc_hash::FxBuildHasher`] as hasher.
pub type HMap<A,B> = rustc_hash::FxHashMap<A,B>;
/// A [`HashSet`](std::collections::HashSet) with [`rustc_hash::FxBuildHasher`] as hasher.
pub type HSet<A> = rustc_hash::FxHashSet<A>;
/// The reference counting pointer type used throughout the engine.
pub type Ptr<A> = Rc<A>;

lazy_static! {
    /// The current working directory.
    pub static ref PWD : PathBuf = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
}

/// Formats `n` as a lowercase roman numeral; `0` and negative numbers yield the empty string.
pub fn to_roman(n:i64) -> String {
    const NUMERALS:[(i64,&str);13] = [
        (1000,"m"),(900,"cm"),(500,"d"),(400,"cd"),(100,"c"),(90,"xc"),
        (50,"l"),(40,"xl"),(10,"x"),(9,"ix"),(5,"v"),(4,"iv"),(1,"i")
    ];
    let mut ret = String::new();
    let mut n = n;
    for (value,s) in NUMERALS {
        while n >= value {
            ret.push_str(s);
            n -= value;
        }
    }
    ret
}

/// Formats `n` as a lowercase letter (`1 => a`, `26 => z`, `27 => aa`, ...).
pub fn to_alpha(n:i64) -> String {
    if n <= 0 { return String::new() }
    let mut ret = Vec::new();
    let mut n = n;
    while n > 0 {
        n -= 1;
        ret.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    ret.iter().rev().collect()
}

/// Formats `n` as a footnote symbol from LaTeX's table of nine; values outside `1..=9` yield
/// the empty string.
pub fn to_fnsymbol(n:i64) -> String {
    const SYMBOLS:[&str;9] = ["*","\u{2020}","\u{2021}","\u{a7}","\u{b6}","\u{2016}","**","\u{2020}\u{2020}","\u{2021}\u{2021}"];
    usize::try_from(n).ok().and_then(|n| n.checked_sub(1)).and_then(|i| SYMBOLS.get(i))
        .map(|s| s.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn roman() {
        assert_eq!(to_roman(1994).to_uppercase(),"MCMXCIV");
        assert_eq!(to_roman(4),"iv");
        assert_eq!(to_roman(0),"");
    }
    #[test]
    fn alpha() {
        assert_eq!(to_alpha(1),"a");
        assert_eq!(to_alpha(26),"z");
        assert_eq!(to_alpha(27),"aa");
    }
    #[test]
    fn fnsymbol() {
        assert_eq!(to_fnsymbol(1),"*");
        assert_eq!(to_fnsymbol(3),"\u{2021}");
        assert_eq!(to_fnsymbol(7),"**");
        assert_eq!(to_fnsymbol(0),"");
        assert_eq!(to_fnsymbol(10),"");
        assert_eq!(to_fnsymbol(-2),"");
        assert_eq!(to_fnsymbol(i64::MAX),"");
    }
}
