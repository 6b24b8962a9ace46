//! Grammar introspection
//!
//! A printable rendition of the productions the parser implements and of the
//! literal-token rules the lexer applies. Reporting only; nothing here is
//! consulted while compiling.

use crate::frontend::lexicon;

static PRODUCTIONS: &[(&str, &str)] = &[
    ("program", "(header '.'?)* (stmt '.'?)* EOF"),
    ("header", "'require' 'language' 'version' STRING"),
    ("header", "IDENT 'is' STRING 'and' 'comes' 'from' STRING 'or' STRING 'with' 'default' expr"),
    ("stmt", "simple_stmt ('then' simple_stmt)*"),
    ("simple_stmt", "'for' expr 'repetitions' ['plus' expr 'warmup' 'repetitions' ['and' 'a' 'synchronization']] simple_stmt"),
    ("simple_stmt", "'for' expr TIMEUNIT simple_stmt"),
    ("simple_stmt", "'for' 'each' IDENT 'in' range_list simple_stmt"),
    ("simple_stmt", "'if' rel_expr 'then' simple_stmt ['otherwise' simple_stmt]"),
    ("simple_stmt", "'let' binding ('and' binding)* 'while' simple_stmt"),
    ("simple_stmt", "'{' [stmt] '}'"),
    ("simple_stmt", "'assert' 'that' STRING 'with' rel_expr"),
    ("simple_stmt", "task_expr action"),
    ("binding", "IDENT 'be' (task_expr | expr)"),
    ("action", "['asynchronously'] 'sends' msg_spec 'to' task_expr ['who' ['asynchronously'] 'receives' ('it' recv_clauses | msg_spec)]"),
    ("action", "['asynchronously'] 'receives' msg_spec 'from' task_expr"),
    ("action", "'multicasts' msg_spec 'to' task_expr"),
    ("action", "'reduces' reduce_spec 'to' task_expr ['who' 'receives' ('it' recv_clauses | reduce_spec)]"),
    ("action", "'synchronizes'"),
    ("action", "'awaits' 'completion'"),
    ("action", "'sleeps' 'for' expr TIMEUNIT"),
    ("action", "'computes' 'for' expr TIMEUNIT"),
    ("action", "'touches' item_count expr DATATYPE 'memory' 'region' ['with' ('random' 'stride' | 'stride' expr DATATYPE)]"),
    ("action", "'outputs' out_item ('and' out_item)*"),
    ("action", "'logs' log_item ('and' log_item)*"),
    ("action", "'resets' 'its' 'counters'"),
    ("msg_spec", "item_count ['unique'] expr DATATYPE [alignment] 'message' msg_clauses"),
    ("reduce_spec", "item_count ['unique'] DATATYPE [alignment] msg_clauses"),
    ("recv_clauses", "[alignment] msg_clauses"),
    ("alignment", "'page' 'aligned'"),
    ("alignment", "expr DATATYPE 'aligned'"),
    ("msg_clauses", "[touching] ['using' 'tag' expr] ['at' 'offset' expr] [('from' | 'into') ('buffer' expr | 'the' 'default' 'buffer')]"),
    ("touching", "'with' 'verification'"),
    ("touching", "'with' 'data' 'touching'"),
    ("touching", "'without' 'data' 'touching'"),
    ("item_count", "'a'"),
    ("item_count", "expr"),
    ("task_expr", "'task' expr"),
    ("task_expr", "'task' 'group' IDENT"),
    ("task_expr", "'task' range_list"),
    ("task_expr", "'tasks' IDENT 'such' 'that' rel_expr"),
    ("task_expr", "'all' 'tasks' [IDENT]"),
    ("task_expr", "'all' 'other' 'tasks'"),
    ("log_item", "['the' AGGREGATE ('and' 'the' AGGREGATE)* 'of'] expr 'as' STRING"),
    ("out_item", "STRING"),
    ("out_item", "expr"),
    ("rel_expr", "rel_conj (('or' | '\\/') rel_conj)*"),
    ("rel_conj", "rel_prim (('and' | '/\\') rel_prim)*"),
    ("rel_prim", "'not' rel_prim"),
    ("rel_prim", "'(' rel_expr ')'"),
    ("rel_prim", "expr ('=' | '<>' | '<' | '>' | '<=' | '>=') expr"),
    ("rel_prim", "expr 'is' ('even' | 'odd')"),
    ("rel_prim", "expr 'divides' expr"),
    ("rel_prim", "expr 'is' ['not'] 'in' range_list"),
    ("rel_prim", "expr 'is' ['not'] 'in' '[' expr ',' expr ']'"),
    ("expr", "mul_expr (('+' | '-' | '|' | 'xor') mul_expr)*"),
    ("mul_expr", "power_expr (('*' | '/' | 'mod' | '<<' | '>>' | '&') power_expr)*"),
    ("power_expr", "unary_expr ['**' power_expr]"),
    ("unary_expr", "('+' | '-' | 'not') unary_expr"),
    ("unary_expr", "primary"),
    ("primary", "INTEGER"),
    ("primary", "IDENT"),
    ("primary", "FUNCTION '(' [arg (',' arg)*] ')'"),
    ("primary", "'(' expr ')'"),
    ("primary", "'my' 'task'"),
    ("arg", "expr"),
    ("arg", "'*'"),
    ("range_list", "range (',' range)*"),
    ("range", "'{' expr (',' expr)* [',' '...' ',' expr] '}'"),
    ("range", "'{' expr 'for' 'each' IDENT 'in' range_list ['such' 'that' rel_expr] '}'"),
];

static OPERATORS: &[(&str, &str)] = &[
    ("ADD", "+"),
    ("SUB", "-"),
    ("STAR", "*"),
    ("SLASH", "/"),
    ("POWER", "**"),
    ("EQ", "="),
    ("NE", "<>"),
    ("LT", "<"),
    ("GT", ">"),
    ("LE", "<="),
    ("GE", ">="),
    ("SHL", "<<"),
    ("SHR", ">>"),
    ("AMPERSAND", "&"),
    ("PIPE", "|"),
    ("DISJUNCTION", "\\/"),
    ("CONJUNCTION", "/\\"),
    ("LPAREN", "("),
    ("RPAREN", ")"),
    ("LBRACE", "{"),
    ("RBRACE", "}"),
    ("LBRACKET", "["),
    ("RBRACKET", "]"),
    ("COMMA", ","),
    ("PERIOD", "."),
    ("ELLIPSIS", "..."),
];

/// Every production as `lhs -> rhs`, in grammar order
pub fn productions() -> Vec<String> {
    PRODUCTIONS
        .iter()
        .map(|(lhs, rhs)| format!("{} -> {}", lhs, rhs))
        .collect()
}

/// Literal-token rules: operator spellings, then the word classes
pub fn token_rules() -> Vec<(String, String)> {
    let mut rules: Vec<(String, String)> = OPERATORS
        .iter()
        .map(|(name, literal)| (name.to_string(), format!("'{}'", literal)))
        .collect();
    rules.push(("IDENT".into(), "[A-Za-z_][A-Za-z0-9_]*".into()));
    rules.push((
        "INTEGER".into(),
        "[0-9]+ ([KMGTkmgt] | [Ee][0-9]+ | st | nd | rd | th)?".into(),
    ));
    rules.push(("STRING".into(), "\"([^\"\\\\] | \\\\.)*\"".into()));
    rules.push(("COMMENT".into(), "#[^\\n]*".into()));
    rules.push((
        "FUNCTION".into(),
        lexicon::FUNCTIONS
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(" | "),
    ));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_productions_cover_entry_rules() {
        let productions = productions();
        for lhs in ["program", "stmt", "msg_spec", "task_expr", "rel_expr", "range"] {
            let prefix = format!("{} -> ", lhs);
            assert!(productions.iter().any(|p| p.starts_with(&prefix)), "{}", lhs);
        }
    }

    #[test]
    fn test_token_rules() {
        let rules = token_rules();
        assert!(rules.iter().any(|(name, lit)| name == "ELLIPSIS" && lit == "'...'"));
        let functions = &rules.iter().find(|(name, _)| name == "FUNCTION").unwrap().1;
        assert!(functions.contains("mesh_neighbor"));
    }
}
