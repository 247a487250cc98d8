#[doc(hidden)]
#[cfg(any(test,doctest))]
#[allow(dead_code)]
pub mod test_utils {
    #[macro_export]
    macro_rules! measure {
        ($key:ident:$x:expr) => {{
            let measure_start = std::time::Instant::now();
            let ret = $x;
            log::info!(target:stringify!($key),"Finished after {:?}",measure_start.elapsed());
            ret
        }};
    }

    #[allow(unused_must_use)]
    pub fn trace() {
        env_logger::builder().filter_level(log::LevelFilter::Trace).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn debug() {
        env_logger::builder().filter_level(log::LevelFilter::Debug).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn info() {
        env_logger::builder().filter_level(log::LevelFilter::Info).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn warn() {
        env_logger::builder().filter_level(log::LevelFilter::Warn).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn error() {
        env_logger::builder().filter_level(log::LevelFilter::Error).is_test(true).try_init();
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::test_utils::*;
    use crate::prelude::*;
    use crate::engine::mouth::Mouth;
    use crate::tex::catcodes::DEFAULT_TABLE;
    use crate::measure;

    fn text(s:&str) -> String {
        let mut e = Engine::default();
        let doc = e.parse_string(s).unwrap();
        doc.text_content(doc.root())
    }

    fn tokenize(s:&str) -> Vec<Token> {
        let mut mouth = Mouth::new();
        mouth.push_string(s,"<test>");
        std::iter::from_fn(|| mouth.get_next(&DEFAULT_TABLE)).collect()
    }

    #[test]
    fn hskip_tokens() {
        assert_eq!(tokenize(r"{\hskip 36 pt}"),vec!(
            Token::begin_group(),Token::cs("hskip"),Token::other('3'),Token::other('6'),Token::space(),
            Token::letter('p'),Token::letter('t'),Token::end_group()
        ));
    }

    #[test]
    fn paragraph_collapsing() {
        let tks = tokenize("a\n\n\n\nb");
        assert_eq!(tks.iter().filter(|t| t.is_cs_named("par")).count(),1);
        assert_eq!(tks.last(),Some(&Token::letter('b')));
    }

    #[test]
    fn catcode_idempotence() {
        assert_eq!(tokenize("\\catcode`\\a=11 ab")[7..],[Token::letter('a'),Token::letter('b')]);
        assert_eq!(text("\\catcode`\\a=11 \\def\\ab{x}\\ab"),"x");
        assert_eq!(text("\\catcode`\\{=1 {a}"),"a");
    }

    #[test]
    fn scopes() {
        debug();
        let mut e = Engine::default();
        let doc = e.parse_string("{\\catcode`\\!=11 \\def\\x!{1}{\\x!}}").unwrap();
        assert_eq!(doc.text_content(doc.root()),"1");
        assert_eq!(e.state.which_code('!'),CategoryCode::Other);
        assert!(!e.state.is_defined("x!"));

        e.parse_string(r"{\gdef\y{2}\global\def\z{3}}").unwrap();
        assert!(e.state.is_defined("y"));
        assert!(e.state.is_defined("z"));
        e.parse_string("{\\global\\catcode`\\!=11 }").unwrap();
        assert_eq!(e.state.which_code('!'),CategoryCode::Letter);
    }

    #[test]
    fn spacing_guard() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"\def\foo#1{\bf#1}\foo{x}").unwrap();
        let root = doc.root();
        let bf = doc.find_all(root,"bf");
        assert_eq!(bf.len(),1);
        assert_eq!(doc.text_content(bf[0]),"x");
        assert_eq!(doc.source(root),r"\bf x");
    }

    #[test]
    fn unterminated_scopes() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"{\def\x{leaked}$a").unwrap();
        assert_eq!(doc.text_content(doc.root()),"a");
        assert_eq!(e.state.depth(),1);
        assert!(e.aux.math_stack.is_empty());
        assert!(!e.state.is_defined("x"));
        // the next document starts outside of any group or math
        let doc = e.parse_string(r"\begin{itemize}\item a").unwrap();
        assert_eq!(doc.find_all(doc.root(),"item").len(),1);
        assert_eq!(e.state.depth(),1);
        assert_eq!(e.aux.list_depth,0);
        assert_eq!(e.parse_string("}").unwrap_err().kind,ErrorKind::Structure);
    }

    #[test]
    fn failed_parse_resets() {
        let mut e = Engine::default();
        let err = e.parse_string(r"{\def\y{1}\begin{center}$x\end{itemize}").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Structure);
        assert_eq!(e.state.depth(),1);
        assert!(e.aux.math_stack.is_empty());
        assert!(!e.state.is_defined("y"));
        assert_eq!(e.parse_string("ok").map(|d| d.text_content(d.root())).unwrap(),"ok");
    }

    #[test]
    fn counter_cycles() {
        let mut e = Engine::default();
        assert_eq!(e.parse_string(r"\newcounter{a}[b]\newcounter{b}[a]\stepcounter{a}ok").unwrap_err().kind,ErrorKind::Undefined);
        let doc = e.parse_string(r"\newcounter{b}\newcounter{a}[b]\stepcounter{a}\stepcounter{b}\arabic{a}ok").unwrap();
        assert_eq!(doc.text_content(doc.root()),"0ok");
    }

    #[test]
    fn integer_limits() {
        assert_eq!(text(r"\newcounter{c}\setcounter{c}{99999999999999999999}\addtocounter{c}{5}\arabic{c}"),"2147483647");
        assert_eq!(text(r"\newcount\n \n=-99999999999999999999 \advance\n by -5 \divide\n by -1 \number\n"),"2147483652");
        let mut e = Engine::default();
        let err = e.parse_string(r"\newcount\n \n=2147483647 \multiply\n 2147483647 \multiply\n 2147483647").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Other);
    }

    #[test]
    fn conditional_nesting() {
        assert_eq!(text(r"\ifnum 2<3 bye\iftrue text\ifcat() hi\fi\else one\fi\fi foo"),"byetext hifoo");
        assert_eq!(text(r"\iffalse }\undefined\begin{x}\fi ok"),"ok");
        assert_eq!(text(r"\ifcase 2 a\or b\or c\else d\fi"),"c");
        assert_eq!(text(r"\iftrue a"),"a");
    }

    #[test]
    fn let_captures_referent() {
        assert_eq!(text(r"\newcommand\foo{old}\let\bar=\foo\renewcommand\foo{new}\bar\foo"),"oldnew");
        assert_eq!(text(r"\def\a{1}\let\b\a\let\c\b\def\a{2}\def\b{3}\c\b\a"),"132");
    }

    #[test]
    fn nested_environments() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"\newenvironment{foo}{A}{B}\begin{foo}\begin{foo}X\end{foo}\end{foo}").unwrap();
        let foos = doc.find_all(doc.root(),"foo");
        assert_eq!(foos.len(),2);
        assert_eq!(doc.parent(foos[0]),Some(doc.root()));
        assert_eq!(doc.parent(foos[1]),Some(foos[0]));
        assert_eq!(doc.text_content(foos[1]),"AXB");
    }

    #[test]
    fn roman_counter() {
        assert_eq!(text(r"\newcounter{year}\setcounter{year}{1994}\Roman{year}"),"MCMXCIV");
        assert_eq!(text(r"\romannumeral 1994"),"mcmxciv");
    }

    #[test]
    fn errors() {
        let mut e = Engine::default();
        let err = e.parse_string("a}").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Structure);
        let err = e.parse_string(r"\ifnum 1?2 \fi").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Conditional);
        let err = e.parse_string(r"\def\a#1{#1}\a").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Argument);
        // unrecognized commands are kept as placeholders
        let doc = e.parse_string(r"\undefinedmacro x").unwrap();
        assert_eq!(doc.find_all(doc.root(),"undefinedmacro").len(),1);
    }

    #[test]
    fn document() { measure!(document: {
        info();
        let src = r"\documentclass{article}
\usepackage{amsmath}
\newcommand{\R}{\mathbb{R}}
\newtheorem{thm}{Theorem}[section]
\begin{document}
\section{Introduction}\label{sec:intro}
Let $x\in\R$.

\begin{thm}[Main]\label{thm:main}
Every \emph{proof} ends.
\end{thm}

\subsection{Lists}
\begin{enumerate}
  \item First, see Section~\ref{sec:intro}.
  \item Second, see Theorem~\ref{thm:main}.
\end{enumerate}
\end{document}
";
        let mut e = Engine::default();
        let doc = e.parse_string(src).unwrap();
        let root = doc.root();
        let section = doc.find_all(root,"section")[0];
        assert_eq!(doc.node(section).ref_text.as_deref(),Some("1"));
        let thm = doc.find_all(root,"thm")[0];
        assert_eq!(doc.node(thm).ref_text.as_deref(),Some("1.1"));
        assert_eq!(doc.node(thm).id.as_deref(),Some("thm:main"));
        let items = doc.find_all(root,"item");
        assert_eq!(items.len(),2);
        assert_eq!(doc.node(items[1]).ref_text.as_deref(),Some("2"));
        assert_eq!(doc.find_all(root,"math").len(),1);
        assert!(doc.find_all(root,"par").len() >= 2);
        assert_eq!(e.state.unresolved_refs().count(),0);
        assert!(e.state.packages.contains_key("amsmath"));
    });}
}
