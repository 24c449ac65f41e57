#[macro_use]
mod common;

#[cfg(test)]
mod number {
    tests! {
        literals in number is OK
        "123"
        "987654"
        "0"
        "123.456"
        "-0.001"
    }

    tests! {
        division in number is OK
        "2.5"
        "3"
    }

    tests! {
        decimal_point_at_eol_err in number is ERR 65
        "[line 1] Error at ';': Expect property name after '.'."
    }

    tests! {
        leading_dot_err in number is ERR 65
        "[line 1] Error at '.': Expect expression."
    }
}
