#![no_main]

use libfuzzer_sys::fuzz_target;
use nbvalx::magics::evaluator::evaluate;
use nbvalx::magics::{Bindings, Value};
use nbvalx_syntax::parser::{allowed_block_from_source, assignment_block_from_source, expression_from_source};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = allowed_block_from_source(s);
        let _ = assignment_block_from_source(s);
        // Evaluation must report errors, never panic
        if let Ok(expr) = expression_from_source(s) {
            let mut scope = Bindings::new();
            scope.insert("a", Value::Int(1));
            scope.insert("b", Value::Str("x".to_string()));
            let _ = evaluate(&expr, &scope);
        }
    }
});
