use crate::Sexpr;

/// Lists narrower than this are written on a single line.
const INLINE_WIDTH: usize = 72;

/// Lists that always open a block, regardless of width.
const BLOCK_FORMS: &[&str] = &[
    "kicad_sch",
    "kicad_symbol_lib",
    "lib_symbols",
    "symbol",
    "sheet_instances",
    "symbol_instances",
    "instances",
    "title_block",
];

/// Format a number the way KiCad writes coordinates: at most four decimals,
/// trailing zeros dropped and no negative zero.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    let mut s = format!("{rounded:.4}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Format an S-expression with KiCad-style layout.
///
/// Short lists stay on one line. Longer lists, and the block forms KiCad
/// always expands, put their leading atoms on the opening line and every
/// following element on its own line indented by two spaces per level, with
/// the closing paren on a line of its own. Output depends only on the tree,
/// so formatting a parsed copy of the output reproduces it exactly.
pub fn format_sexpr(sexpr: &Sexpr, indent_level: usize) -> String {
    let mut out = String::new();
    write_sexpr(&mut out, sexpr, indent_level);
    out
}

fn write_sexpr(out: &mut String, sexpr: &Sexpr, level: usize) {
    push_indent(out, level);
    match sexpr {
        Sexpr::List(items) => write_list(out, sexpr, items, level),
        atom => write_atom(out, atom),
    }
}

fn write_list(out: &mut String, list: &Sexpr, items: &[Sexpr], level: usize) {
    if inline_width(list, INLINE_WIDTH).is_some() {
        write_inline(out, list);
        return;
    }

    out.push('(');
    let head = items.iter().take_while(|item| item.is_atom()).count();
    for (i, atom) in items[..head].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_atom(out, atom);
    }
    if head == items.len() {
        out.push(')');
        return;
    }
    for item in &items[head..] {
        out.push('\n');
        write_sexpr(out, item, level + 1);
    }
    out.push('\n');
    push_indent(out, level);
    out.push(')');
}

fn write_inline(out: &mut String, sexpr: &Sexpr) {
    match sexpr {
        Sexpr::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_inline(out, item);
            }
            out.push(')');
        }
        atom => write_atom(out, atom),
    }
}

fn write_atom(out: &mut String, atom: &Sexpr) {
    match atom {
        Sexpr::Symbol(s) => out.push_str(s),
        Sexpr::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Sexpr::List(_) => write_inline(out, atom),
    }
}

/// Width of `sexpr` written on one line, or `None` if it exceeds `budget` or
/// contains a block form.
fn inline_width(sexpr: &Sexpr, budget: usize) -> Option<usize> {
    match sexpr {
        Sexpr::Symbol(s) => (s.len() <= budget).then_some(s.len()),
        Sexpr::String(s) => {
            let width = escape_string(s).len() + 2;
            (width <= budget).then_some(width)
        }
        Sexpr::List(items) => {
            if sexpr.tag().is_some_and(|tag| BLOCK_FORMS.contains(&tag)) {
                return None;
            }
            let mut width = 2 + items.len().saturating_sub(1);
            for item in items {
                if width > budget {
                    return None;
                }
                width += inline_width(item, budget - width)?;
            }
            (width <= budget).then_some(width)
        }
    }
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}
