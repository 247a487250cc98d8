/*! LaTeX counters and the `\the<counter>` formats built from them. */

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use crate::tex::numerics::MAX_INT;
use crate::utils::{HMap, HSet, Ptr, to_alpha, to_fnsymbol, to_roman};

/// A named integer register, reset whenever its `resetby` counter changes.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Counter {
    pub name:Ptr<str>,
    pub resetby:Option<Ptr<str>>,
    pub value:i64
}
impl Counter {
    /// Formats the value in the given style (`arabic`, `roman`, `Roman`, `alph`, `Alph`, `fnsymbol`).
    pub fn format(&self,style:&str) -> Option<String> {
        Some(match style {
            "arabic" => self.value.to_string(),
            "roman" => to_roman(self.value),
            "Roman" => to_roman(self.value).to_uppercase(),
            "alph" => to_alpha(self.value),
            "Alph" => to_alpha(self.value).to_uppercase(),
            "fnsymbol" => to_fnsymbol(self.value),
            _ => return None
        })
    }
}

/// All counters of a document. Counters are never removed.
#[derive(Clone,Debug,Default)]
pub struct Counters {
    map:HMap<Ptr<str>,Counter>
}
impl Counters {
    /// Creates a counter, unless one with that name exists already; returns whether it was created.
    pub fn new_counter(&mut self,name:&str,resetby:Option<&str>,initial:i64) -> bool {
        if self.map.contains_key(name) { return false }
        let name:Ptr<str> = name.into();
        self.map.insert(name.clone(),Counter{name,resetby:resetby.map(|s| s.into()),value:initial});
        true
    }
    pub fn get(&self,name:&str) -> Option<&Counter> { self.map.get(name) }
    pub fn value(&self,name:&str) -> Option<i64> { self.map.get(name).map(|c| c.value) }
    pub fn contains(&self,name:&str) -> bool { self.map.contains_key(name) }

    /// `\setcounter`; returns `false` if there is no such counter.
    pub fn set(&mut self,name:&str,value:i64) -> bool {
        match self.map.get_mut(name) {
            Some(c) => c.value = value,
            None => return false
        }
        self.reset_dependents(name);
        true
    }
    /// `\addtocounter`
    pub fn add(&mut self,name:&str,value:i64) -> bool {
        match self.map.get_mut(name) {
            Some(c) => c.value = c.value.saturating_add(value).clamp(-MAX_INT,MAX_INT),
            None => return false
        }
        self.reset_dependents(name);
        true
    }
    /// `\stepcounter`
    pub fn step(&mut self,name:&str) -> bool { self.add(name,1) }

    /// Whether making `name` reset by `within` would close a reset cycle.
    pub fn would_cycle(&self,name:&str,within:&str) -> bool {
        let mut current = Some(within);
        let mut steps = 0;
        while let Some(c) = current {
            if c == name { return true }
            steps += 1;
            if steps > self.map.len() { return true }
            current = self.map.get(c).and_then(|c| c.resetby.as_deref());
        }
        false
    }

    /// Zeroes all counters reset by `name`, transitively. Each counter is visited at most once.
    fn reset_dependents(&mut self,name:&str) {
        let mut visited:HSet<Ptr<str>> = HSet::default();
        let mut todo:Vec<Ptr<str>> = vec!(name.into());
        while let Some(current) = todo.pop() {
            if !visited.insert(current.clone()) { continue }
            for c in self.map.values_mut() {
                if c.resetby.as_deref() == Some(&*current) && !visited.contains(&c.name) {
                    c.value = 0;
                    todo.push(c.name.clone());
                }
            }
        }
    }
}

lazy_static! {
    static ref SHORT_REF : Regex = Regex::new(r"\$(\w+)").unwrap_or_else(|_| unreachable!());
    static ref LONG_REF : Regex = Regex::new(r"\$\{\s*(\w+)(?:\.(\w+))?\s*\}").unwrap_or_else(|_| unreachable!());
    static ref ZERO : Regex = Regex::new(r"\b0[^\dA-Za-z]+").unwrap_or_else(|_| unreachable!());
}

/// The format of a `\the<counter>` command: a template in which `$name`, `${name}` and
/// `${name.style}` are replaced by the (styled) value of the counter `name`, and `${thename}`
/// by the format of `\thename`.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct CounterFormat(pub Ptr<str>);
impl CounterFormat {
    pub fn new(counter:&str) -> Self { CounterFormat(format!("${{{}}}",counter).into()) }

    /// Renders the template. `lookup` resolves `thename` references to other formats. Zero
    /// counter values followed by a separator are dropped, so that e.g. `${chapter}.${section}`
    /// renders as `1` when there is no chapter.
    pub fn render<F:Fn(&str) -> Option<CounterFormat>>(&self,counters:&Counters,lookup:&F) -> String {
        self.render_i(counters,lookup,0)
    }
    fn render_i<F:Fn(&str) -> Option<CounterFormat>>(&self,counters:&Counters,lookup:&F,depth:u8) -> String {
        let template = SHORT_REF.replace_all(&self.0,"$${$1}");
        let s = LONG_REF.replace_all(&template,|caps:&Captures| {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if let Some(stripped) = name.strip_prefix("the") {
                if !counters.contains(name) && depth < 8 {
                    if let Some(f) = lookup(name) {
                        return f.render_i(counters,lookup,depth + 1)
                    }
                    log::debug!(target:"counters","No format for \\{}; using the value of {}",name,stripped);
                    return counters.get(stripped).and_then(|c| c.format("arabic")).unwrap_or_default()
                }
            }
            let style = caps.get(2).map(|m| m.as_str()).unwrap_or("arabic");
            match counters.get(name) {
                Some(c) => c.format(style).unwrap_or_else(|| c.value.to_string()),
                None => {
                    log::warn!(target:"counters","Unknown counter {} in counter format",name);
                    String::new()
                }
            }
        });
        ZERO.replace_all(&s,"").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets() {
        let mut c = Counters::default();
        c.new_counter("chapter",None,0);
        c.new_counter("section",Some("chapter"),0);
        c.new_counter("subsection",Some("section"),0);
        c.step("chapter");
        c.step("section");
        c.step("section");
        c.step("subsection");
        assert_eq!(c.value("section"),Some(2));
        c.step("chapter");
        assert_eq!(c.value("section"),Some(0));
        assert_eq!(c.value("subsection"),Some(0));
        assert!(!c.new_counter("chapter",None,5));
        assert_eq!(c.value("chapter"),Some(2));
        assert!(!c.set("nonexistent",1));
    }

    #[test]
    fn reset_cycles() {
        let mut c = Counters::default();
        c.new_counter("a",None,0);
        c.new_counter("b",Some("a"),0);
        assert!(c.would_cycle("a","b"));
        assert!(c.would_cycle("a","a"));
        assert!(!c.would_cycle("c","b"));
        // a cycle built behind the checks still terminates
        if let Some(a) = c.map.get_mut("a") { a.resetby = Some("b".into()) }
        c.set("b",4);
        assert!(c.step("a"));
        assert_eq!(c.value("a"),Some(1));
        assert_eq!(c.value("b"),Some(0));
    }

    #[test]
    fn saturation() {
        let mut c = Counters::default();
        c.new_counter("c",None,MAX_INT - 1);
        assert!(c.add("c",5));
        assert_eq!(c.value("c"),Some(MAX_INT));
        assert!(c.add("c",-2 * MAX_INT));
        assert_eq!(c.value("c"),Some(-MAX_INT));
    }

    #[test]
    fn styles() {
        let c = Counter{name:"x".into(),resetby:None,value:1994};
        assert_eq!(c.format("Roman").as_deref(),Some("MCMXCIV"));
        assert_eq!(c.format("roman").as_deref(),Some("mcmxciv"));
        let c = Counter{name:"x".into(),resetby:None,value:3};
        assert_eq!(c.format("alph").as_deref(),Some("c"));
        assert_eq!(c.format("Alph").as_deref(),Some("C"));
        assert_eq!(c.format("fnsymbol").as_deref(),Some("\u{2021}"));
        assert_eq!(c.format("weird"),None);
    }

    #[test]
    fn formats() {
        let mut c = Counters::default();
        c.new_counter("chapter",None,0);
        c.new_counter("section",Some("chapter"),0);
        c.step("section");
        let thechapter = CounterFormat::new("chapter");
        let lookup = |name:&str| if name == "thechapter" { Some(thechapter.clone()) } else { None };
        let thesection = CounterFormat("${thechapter}.${section}".into());
        assert_eq!(thesection.render(&c,&lookup),"1");
        c.step("chapter");
        c.step("section");
        assert_eq!(thesection.render(&c,&lookup),"1.1");
        assert_eq!(CounterFormat("$section.${chapter.Roman}".into()).render(&c,&lookup),"1.I");
    }
}
