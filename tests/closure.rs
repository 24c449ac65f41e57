#[macro_use]
mod common;

#[cfg(test)]
mod closure {
    tests! {
        counter in closure is OK
        "1"
        "2"
        "3"
    }

    tests! {
        capture_over_shadowing in closure is OK
        "global"
        "global"
    }

    tests! {
        assign_to_closure in closure is OK
        "local"
        "after f"
        "after f"
        "after g"
    }

    tests! {
        close_over_parameter in closure is OK
        "param"
    }

    tests! {
        nested_closure in closure is OK
        "a"
        "b"
    }

    tests! {
        separate_counters in closure is OK
        "1"
        "2"
        "1"
    }
}
