/*!
    Category codes for characters, implemented as the enum [`CategoryCode`]. A [`CategoryTable`]
    assigns each character to (at most) one of the sixteen character sets, one per category code.
*/

use std::fmt::Formatter;
use lazy_static::lazy_static;

/** The category code of a character.

To convert between [`CategoryCode`]s and their numerical values (as [`u8`]), use [`CategoryCode::try_from`]
and [`CategoryCode::into`], respectively.

# Example
```rust
use tex_dom::tex::catcodes::CategoryCode;

let cat = CategoryCode::BeginGroup;
let num : u8 = cat.into();
assert_eq!(num,1);
let cat2 = CategoryCode::try_from(1).unwrap();
assert_eq!(cat2,cat);
```
 */
#[derive(Copy,PartialEq,Eq,Clone,Hash,Default)]
pub enum CategoryCode {
    /// Escape character (0); usually `\`
    Escape,
    /// Begin group character (1); usually `{`
    BeginGroup,
    /// End group character (2); usually `}`
    EndGroup,
    /// Math shift character (3); usually `$`
    MathShift,
    /// Alignment tab character (4); usually `&`
    AlignmentTab,
    /// End of line character (5); usually `\n`
    EOL,
    /// Parameter character (6); usually `#`
    Parameter,
    /// Superscript character (7); usually `^`
    Superscript,
    /// Subscript character (8); usually `_`
    Subscript,
    /// Ignored character (9)
    Ignored,
    /// Space character (10); usually ` ` and tabs
    Space,
    /// Letter character (11), usually a-z, A-Z and `@`
    Letter,
    /// Other character (12), the default for everything not assigned elsewhere
    #[default]
    Other,
    /// Active character (13); usually `~`
    Active,
    /// Comment character (14); usually `%`
    Comment,
    /// Invalid character (15)
    Invalid,
    /// Not an "official" category code; marks a control sequence that must not be expanded
    /// (the result of `\noexpand`).
    Expanded,
    /// Not an "official" category code; marks the end of a token list that was pushed
    /// to the input for internal processing.
    EndTokens
}

impl std::fmt::Debug for CategoryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self,f)
    }
}
impl std::fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use CategoryCode::*;
        write!(f,"{}",match self {
            Escape => "Escape",
            BeginGroup => "BeginGroup",
            EndGroup => "EndGroup",
            MathShift => "MathShift",
            AlignmentTab => "AlignmentTab",
            EOL => "EOL",
            Parameter => "Parameter",
            Superscript => "Superscript",
            Subscript => "Subscript",
            Ignored => "Ignored",
            Space => "Space",
            Letter => "Letter",
            Other => "Other",
            Active => "Active",
            Comment => "Comment",
            Invalid => "Invalid",
            Expanded => "Expanded",
            EndTokens => "EndTokens"
        })
    }
}

impl From<CategoryCode> for u8 {
    fn from(cc:CategoryCode) -> u8 {
        use CategoryCode::*;
        match cc {
            Escape => 0,
            BeginGroup => 1,
            EndGroup => 2,
            MathShift => 3,
            AlignmentTab => 4,
            EOL => 5,
            Parameter => 6,
            Superscript => 7,
            Subscript => 8,
            Ignored => 9,
            Space => 10,
            Letter => 11,
            Other => 12,
            Active => 13,
            Comment => 14,
            Invalid => 15,
            Expanded => 100,
            EndTokens => 101
        }
    }
}

impl TryFrom<u8> for CategoryCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use CategoryCode::*;
        Ok(match value {
            0 => Escape,
            1 => BeginGroup,
            2 => EndGroup,
            3 => MathShift,
            4 => AlignmentTab,
            5 => EOL,
            6 => Parameter,
            7 => Superscript,
            8 => Subscript,
            9 => Ignored,
            10 => Space,
            11 => Letter,
            12 => Other,
            13 => Active,
            14 => Comment,
            15 => Invalid,
            _ => return Err(())
        })
    }
}

/// The order in which the character sets of a [`CategoryTable`] are consulted; the first
/// set containing a character determines its category.
const LOOKUP_ORDER:[CategoryCode;15] = {
    use CategoryCode::*;
    [Letter,Space,EOL,BeginGroup,EndGroup,Escape,Superscript,Subscript,MathShift,
        AlignmentTab,Comment,Active,Parameter,Ignored,Invalid]
};

/**
A table of sixteen character sets, indexed by [`CategoryCode`] `0..=15`. Characters not
contained in any set are [`Other`](CategoryCode::Other).

Tables are treated as immutable values; [`with_code`](CategoryTable::with_code) returns a
modified copy, so that a scope can replace its table without affecting enclosing ones.
*/
#[derive(Clone,PartialEq,Eq)]
pub struct CategoryTable {
    sets:[String;16]
}
impl CategoryTable {
    /// A table with every character [`Other`](CategoryCode::Other).
    pub fn empty() -> Self {
        CategoryTable { sets:array_init::array_init(|_| String::new()) }
    }
    /// Determines the [`CategoryCode`] of `c`.
    pub fn which_code(&self,c:char) -> CategoryCode {
        for code in LOOKUP_ORDER {
            if self.set(code).contains(c) { return code }
        }
        CategoryCode::Other
    }
    /// The characters assigned to `code`.
    pub fn set(&self,code:CategoryCode) -> &str {
        let i:u8 = code.into();
        match self.sets.get(i as usize) {
            Some(s) => s,
            None => ""
        }
    }
    /// Assigns `c` to `code`, removing it from every other set first. Since [`Other`](CategoryCode::Other)
    /// is the default, it is never stored explicitly.
    pub fn assign(&mut self,c:char,code:CategoryCode) {
        for s in self.sets.iter_mut() {
            if s.contains(c) { s.retain(|x| x != c) }
        }
        let i:u8 = code.into();
        if code != CategoryCode::Other {
            if let Some(s) = self.sets.get_mut(i as usize) {
                s.push(c)
            }
        }
    }
    /// Returns a copy of this table with `c` assigned to `code`.
    pub fn with_code(&self,c:char,code:CategoryCode) -> Self {
        let mut ret = self.clone();
        ret.assign(c,code);
        ret
    }
}
impl std::fmt::Debug for CategoryTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        for (i,s) in self.sets.iter().enumerate() {
            if !s.is_empty() {
                m.entry(&CategoryCode::try_from(i as u8).unwrap_or_default(),s);
            }
        }
        m.finish()
    }
}
impl Default for CategoryTable {
    fn default() -> Self { DEFAULT_TABLE.clone() }
}

lazy_static! {
    /**
        The default [`CategoryTable`]. All characters have [`CategoryCode::Other`] (12) except for:

        | Character        | Category Code   |
        |------------------|-----------------|
        | `\`              | [`Escape`](CategoryCode::Escape)  |
        | `{`              | [`BeginGroup`](CategoryCode::BeginGroup)  |
        | `}`              | [`EndGroup`](CategoryCode::EndGroup)  |
        | `$`              | [`MathShift`](CategoryCode::MathShift)  |
        | `&`              | [`AlignmentTab`](CategoryCode::AlignmentTab)  |
        | `\n`, `\r`       | [`EOL`](CategoryCode::EOL)       |
        | `#`              | [`Parameter`](CategoryCode::Parameter)|
        | `^`              | [`Superscript`](CategoryCode::Superscript)|
        | `_`              | [`Subscript`](CategoryCode::Subscript)|
        | `\0`             | [`Ignored`](CategoryCode::Ignored)|
        | ` `, `\t`, form feed | [`Space`](CategoryCode::Space)|
        | a-z, A-Z, `@`    | [`Letter`](CategoryCode::Letter) |
        | `~`              | [`Active`](CategoryCode::Active)  |
        | `%`              | [`Comment`](CategoryCode::Comment)|
    */
    pub static ref DEFAULT_TABLE : CategoryTable = {
        use CategoryCode::*;
        let mut table = CategoryTable::empty();
        for (c,code) in [('\\',Escape),('{',BeginGroup),('}',EndGroup),('$',MathShift),('&',AlignmentTab),
                         ('\n',EOL),('\r',EOL),('#',Parameter),('^',Superscript),('_',Subscript),('\0',Ignored),
                         (' ',Space),('\t',Space),('\u{000C}',Space),('~',Active),('%',Comment),('@',Letter)] {
            table.assign(c,code);
        }
        for c in ('a'..='z').chain('A'..='Z') { table.assign(c,Letter) }
        table
    };
    /// The table used for reading verbatim material: only spaces and line ends keep their
    /// categories, everything else is [`Other`](CategoryCode::Other).
    pub static ref VERBATIM_TABLE : CategoryTable = {
        let mut table = CategoryTable::empty();
        table.assign(' ',CategoryCode::Space);
        table.assign('\n',CategoryCode::EOL);
        for c in ('a'..='z').chain('A'..='Z') { table.assign(c,CategoryCode::Letter) }
        table
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults() {
        let t = &*DEFAULT_TABLE;
        assert_eq!(t.which_code('\\'),CategoryCode::Escape);
        assert_eq!(t.which_code('@'),CategoryCode::Letter);
        assert_eq!(t.which_code('x'),CategoryCode::Letter);
        assert_eq!(t.which_code('1'),CategoryCode::Other);
        assert_eq!(t.which_code('\t'),CategoryCode::Space);
        assert_eq!(t.which_code('\r'),CategoryCode::EOL);
        assert_eq!(t.which_code('~'),CategoryCode::Active);
    }
    #[test]
    fn reassign() {
        let t = DEFAULT_TABLE.with_code('@',CategoryCode::Other);
        assert_eq!(t.which_code('@'),CategoryCode::Other);
        assert!(!t.set(CategoryCode::Letter).contains('@'));
        // the original is untouched
        assert_eq!(DEFAULT_TABLE.which_code('@'),CategoryCode::Letter);
        let t = t.with_code('!',CategoryCode::Active);
        assert_eq!(t.which_code('!'),CategoryCode::Active);
        let t = t.with_code('!',CategoryCode::Comment);
        assert_eq!(t.which_code('!'),CategoryCode::Comment);
        assert!(!t.set(CategoryCode::Active).contains('!'));
    }
    #[test]
    fn idempotent() {
        let t = DEFAULT_TABLE.with_code('{',CategoryCode::BeginGroup);
        assert_eq!(t.which_code('{'),CategoryCode::BeginGroup);
        assert_eq!(t.with_code('{',CategoryCode::BeginGroup),t);
    }
}
