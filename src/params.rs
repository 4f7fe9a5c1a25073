use std::fmt::Display;
use std::str::{self, FromStr};

/// A free-form, named metadata value attached to a device or acquisition record.
pub trait ParamLike {
    fn name(&self) -> &str;
    fn value(&self) -> &str;
    fn unit(&self) -> Unit;

    fn coerce<T: str::FromStr>(&self) -> Result<T, T::Err> {
        self.value().parse::<T>()
    }

    fn is_empty(&self) -> bool {
        self.value().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: String,
    pub value: String,
    pub unit: Unit,
}

impl Param {
    pub fn new() -> Param {
        Param {
            ..Default::default()
        }
    }

    pub fn new_key_value<K: Into<String>, V: ToString>(name: K, value: V) -> Param {
        let mut inst = Self::new();
        inst.name = name.into();
        inst.value = value.to_string();
        inst
    }

    pub fn coerce<T: str::FromStr>(&self) -> Result<T, T::Err> {
        self.value.parse::<T>()
    }

    pub fn with_unit<S: AsRef<str>>(mut self, name: S) -> Param {
        self.unit = Unit::from_name(name.as_ref());
        self
    }

    pub fn with_unit_t(mut self, unit: &Unit) -> Param {
        self.unit = *unit;
        self
    }
}

impl ParamLike for Param {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn unit(&self) -> Unit {
        self.unit
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit {
            Unit::Unknown => write!(f, "{}={}", self.name, self.value),
            unit => write!(f, "{}={} {}", self.name, self.value, unit.symbol()),
        }
    }
}

pub type ParamList = Vec<Param>;

pub trait ParamDescribed {
    fn params(&self) -> &ParamList;
    fn params_mut(&mut self) -> &mut ParamList;

    fn add_param(&mut self, param: Param) {
        self.params_mut().push(param);
    }

    fn remove_param(&mut self, index: usize) -> Param {
        self.params_mut().remove(index)
    }

    fn get_param_by_name(&self, name: &str) -> Option<&Param> {
        self.params().iter().find(|param| param.name == name)
    }
}

#[macro_export]
macro_rules! impl_param_described {
    ($($t:ty), +) => {$(

        impl $crate::params::ParamDescribed for $t {
            fn params(&self) -> &$crate::params::ParamList {
                return &self.params
            }

            fn params_mut(&mut self) -> &mut $crate::params::ParamList {
                return &mut self.params
            }
        }
    )+};
}

/// Units that a parameter's value might have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    // Length
    Nanometer,
    Micrometer,
    Millimeter,
    Meter,

    // Time
    Millisecond,
    Second,
    Hertz,

    // Power
    Milliwatt,
    Watt,
    WattPerSquareMeter,

    // Signal
    ArbitraryUnit,
    Percent,

    #[default]
    Unknown,
}

impl Unit {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Nanometer => "nm",
            Self::Micrometer => "um",
            Self::Millimeter => "mm",
            Self::Meter => "m",
            Self::Millisecond => "ms",
            Self::Second => "s",
            Self::Hertz => "Hz",
            Self::Milliwatt => "mW",
            Self::Watt => "W",
            Self::WattPerSquareMeter => "W/m^2",
            Self::ArbitraryUnit => "a.u.",
            Self::Percent => "%",
            Self::Unknown => "",
        }
    }

    pub fn from_name(name: &str) -> Unit {
        match name {
            "nanometer" | "nm" => Self::Nanometer,
            "micrometer" | "um" | "µm" => Self::Micrometer,
            "millimeter" | "mm" => Self::Millimeter,
            "meter" | "m" => Self::Meter,

            "millisecond" | "ms" => Self::Millisecond,
            "second" | "s" => Self::Second,
            "hertz" | "Hz" => Self::Hertz,

            "milliwatt" | "mW" => Self::Milliwatt,
            "watt" | "W" => Self::Watt,
            "watt per square meter" | "W/m^2" => Self::WattPerSquareMeter,

            "arbitrary unit" | "a.u." => Self::ArbitraryUnit,
            "percent" | "%" => Self::Percent,
            _ => Unit::Unknown,
        }
    }

    pub fn from_param(param: &Param) -> Unit {
        param.unit
    }
}

impl FromStr for Unit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Described {
        params: ParamList,
    }

    impl_param_described!(Described);

    #[test]
    fn test_param_lookup() {
        let mut thing = Described::default();
        thing.add_param(Param::new_key_value("power", 10.5).with_unit("mW"));
        thing.add_param(Param::new_key_value("pulse rate", 80).with_unit_t(&Unit::Hertz));

        let power = thing.get_param_by_name("power").unwrap();
        assert_eq!(power.coerce::<f64>().unwrap(), 10.5);
        assert_eq!(power.unit(), Unit::Milliwatt);
        assert_eq!(power.to_string(), "power=10.5 mW");
        assert!(thing.get_param_by_name("gain").is_none());

        let removed = thing.remove_param(0);
        assert_eq!(removed.name, "power");
        assert_eq!(thing.params().len(), 1);
    }

    #[test]
    fn test_unit_names() {
        assert_eq!("nm".parse::<Unit>().unwrap(), Unit::Nanometer);
        assert_eq!(Unit::from_name("furlong"), Unit::Unknown);
        assert_eq!(Unit::Micrometer.to_string(), "um");
    }
}
