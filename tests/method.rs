#[macro_use]
mod common;

#[cfg(test)]
mod method {
    tests! {
        bound_method in method is OK
        "Jane"
    }

    tests! {
        bound_to_original in method is OK
        "Jane"
    }

    tests! {
        not_found_err in method is ERR 75
        "Undefined property 'unknown'."
        "[line 2]"
    }

    tests! {
        arity_err in method is ERR 75
        "Expected 2 arguments but got 1."
        "[line 4]"
    }
}
