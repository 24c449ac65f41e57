#[macro_use]
mod common;

#[cfg(test)]
mod for_loop {
    tests! {
        sum in for is OK
        "10"
    }

    tests! {
        scope in for is OK
        "0"
        "after"
    }

    tests! {
        condition_only in for is OK
        "0"
        "1"
        "2"
    }

    tests! {
        closure_in_body in for is OK
        "1"
    }

    tests! {
        statement_initializer in for is OK
        "2"
        "3"
    }
}
