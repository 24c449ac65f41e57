#[macro_use]
mod common;

#[cfg(test)]
mod function {
    tests! {
        print_function in function is OK
        "<fn foo>"
    }

    tests! {
        print_native in function is OK
        "<native fn>"
    }

    tests! {
        parameters in function is OK
        "6"
    }

    tests! {
        recursion in function is OK
        "21"
    }

    tests! {
        nested_call in function is OK
        "2"
        "1"
    }

    tests! {
        no_return_is_nil in function is OK
        "nil"
    }

    tests! {
        missing_arguments_err in function is ERR 75
        "Expected 2 arguments but got 1."
        "[line 2]"
    }

    tests! {
        extra_arguments_err in function is ERR 75
        "Expected 2 arguments but got 4."
        "[line 5]"
    }
}
