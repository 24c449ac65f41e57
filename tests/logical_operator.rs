#[macro_use]
mod common;

#[cfg(test)]
mod logical_operator {
    tests! {
        and in logical_operator is OK
        "2"
        "false"
        "nil"
    }

    tests! {
        or in logical_operator is OK
        "1"
        "fallback"
        "false"
    }

    tests! {
        short_circuit in logical_operator is OK
        "evaluated"
    }
}
