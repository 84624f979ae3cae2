#![warn(missing_docs)]
//! Module for uom macros that facilitate the creation of lengths and angles as single values or points
/// helper macro to create the units
#[macro_export]
macro_rules! uom_unit_creator {
    ($unit:ident, $unit_type:ident, $val1:expr) => {
        $unit_type::new::<$unit>($val1)
    };
    ($unit:ident, $unit_type:ident, $val1:expr, $val2:expr) => {
        {
            use nalgebra::Point2;
            Point2::new(
                $unit_type::new::<$unit>($val1),
                $unit_type::new::<$unit>($val2))
        }
    };
}

///macro to create a Length in meter
#[macro_export]
macro_rules! meter {
    ($( $x:expr ),*) =>{
        {
            use uom::si::{f64::Length, length::meter};
            $crate::uom_unit_creator![meter, Length, $( $x ),*]
        }
    };
}
///macro to create a Length in millimeter
#[macro_export]
macro_rules! millimeter {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Length, length::millimeter};
        $crate::uom_unit_creator![millimeter, Length, $( $x ),*]
    }};
}
///macro to create a Length in micrometer
#[macro_export]
macro_rules! micrometer {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Length, length::micrometer};
        $crate::uom_unit_creator![micrometer, Length, $( $x ),*]
    }};
}
///macro to create a Length in nanometer
#[macro_export]
macro_rules! nanometer {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Length, length::nanometer};
        $crate::uom_unit_creator![nanometer, Length, $( $x ),*]
    }};
}
///macro to create an Angle in degree
#[macro_export]
macro_rules! degree {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Angle, angle::degree};
        $crate::uom_unit_creator![degree, Angle, $( $x ),*]
    }};
}
///macro to create an Angle in radian
#[macro_export]
macro_rules! radian {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Angle, angle::radian};
        $crate::uom_unit_creator![radian, Angle, $( $x ),*]
    }};
}
///macro to create an Angle in milliradian
#[macro_export]
macro_rules! milliradian {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Angle, angle::radian};
        $crate::uom_unit_creator![radian, Angle, $( 1e-3*$x ),*]
    }};
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use uom::si::{angle::radian, length::meter};
    #[test]
    fn lengths() {
        assert_abs_diff_eq!(millimeter!(1.0).get::<meter>(), 1e-3);
        assert_abs_diff_eq!(nanometer!(10.0).get::<meter>(), 1e-8, epsilon = 1e-20);
        let p = micrometer!(1.0, 2.0);
        assert_abs_diff_eq!(p.y.get::<meter>(), 2e-6, epsilon = 1e-18);
    }
    #[test]
    fn angles() {
        assert_abs_diff_eq!(degree!(180.0).get::<radian>(), std::f64::consts::PI);
        assert_abs_diff_eq!(milliradian!(10.0).get::<radian>(), 0.01);
    }
}
