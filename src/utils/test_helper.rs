//! various helper functions used to simplify unit tests.
//!
//! **Note**: This module is only compiled and used during testing.

#[cfg(test)]
pub mod test_helper {
    use log::Level;
    use num::complex::Complex64;

    /// Assert that exactly the given messages were logged with the given level.
    pub fn check_logs(level: Level, expected: &[&str]) {
        let expected = expected.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        testing_logger::validate(move |captured_logs| {
            let captured: Vec<_> = captured_logs.iter().filter(|l| l.level == level).collect();
            let bodies: Vec<&str> = captured.iter().map(|l| l.body.as_str()).collect();
            assert_eq!(captured.len(), expected.len(), "captured: {bodies:?}");
            for (log, msg) in captured.iter().zip(expected.iter()) {
                assert_eq!(&log.body, msg);
            }
        });
    }
    pub fn check_warnings(expected_warnings: &[&str]) {
        check_logs(Level::Warn, expected_warnings);
    }
    /// Assert two complex fields are equal sample by sample within `epsilon`.
    pub fn assert_fields_eq(left: &[Complex64], right: &[Complex64], epsilon: f64) {
        assert_eq!(left.len(), right.len());
        for (i, (l, r)) in left.iter().zip(right).enumerate() {
            assert!(
                (l - r).norm() <= epsilon,
                "field sample {i} differs: {l} <-> {r}"
            );
        }
    }
}
