#[macro_use]
mod common;

#[cfg(test)]
mod this_expr {
    tests! {
        in_method in this is OK
        "<Foo instance>"
    }

    tests! {
        closure_captures_this in this is OK
        "<Foo instance>"
    }

    tests! {
        outside_class_err in this is ERR 65
        "[line 1] Error at 'this': Can't use 'this' outside of a class."
    }

    tests! {
        in_function_err in this is ERR 65
        "[line 1] Error at 'this': Can't use 'this' outside of a class."
    }
}
