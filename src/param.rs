/// Address prefix shared by every tracked parameter.
pub const NAMESPACE: &str = "/avatar/parameters/v2/";

/// Face-tracking parameters the monitor understands.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    EyeLeftX = 0,
    EyeRightX = 1,
    EyeLeftY = 2,
    EyeRightY = 3,
    EyeLidLeft = 4,
    EyeLidRight = 5,
    PupilDilation = 6,
}

/// Sample field a parameter writes to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Paired field A, compared against [`Slot::PairedB`].
    PairedA,
    PairedB,
    Aux(AuxField),
}

/// Sticky fields carried along with each sample.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuxField {
    LeftY = 0,
    RightY = 1,
    LeftLid = 2,
    RightLid = 3,
    PupilDilation = 4,
}

impl AuxField {
    pub const COUNT: usize = 5;

    pub const ALL: [AuxField; AuxField::COUNT] = [
        AuxField::LeftY,
        AuxField::RightY,
        AuxField::LeftLid,
        AuxField::RightLid,
        AuxField::PupilDilation,
    ];

    /// Column name used in exports.
    pub fn column(self) -> &'static str {
        match self {
            AuxField::LeftY => "left_y",
            AuxField::RightY => "right_y",
            AuxField::LeftLid => "left_lid",
            AuxField::RightLid => "right_lid",
            AuxField::PupilDilation => "pupil_dilation",
        }
    }
}

impl Param {
    pub const ALL: [Param; 7] = [
        Param::EyeLeftX,
        Param::EyeRightX,
        Param::EyeLeftY,
        Param::EyeRightY,
        Param::EyeLidLeft,
        Param::EyeLidRight,
        Param::PupilDilation,
    ];

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Param::EyeLeftX),
            1 => Some(Param::EyeRightX),
            2 => Some(Param::EyeLeftY),
            3 => Some(Param::EyeRightY),
            4 => Some(Param::EyeLidLeft),
            5 => Some(Param::EyeLidRight),
            6 => Some(Param::PupilDilation),
            _ => None,
        }
    }

    /// Parameter name without the namespace.
    pub fn name(self) -> &'static str {
        match self {
            Param::EyeLeftX => "EyeLeftX",
            Param::EyeRightX => "EyeRightX",
            Param::EyeLeftY => "EyeLeftY",
            Param::EyeRightY => "EyeRightY",
            Param::EyeLidLeft => "EyeLidLeft",
            Param::EyeLidRight => "EyeLidRight",
            Param::PupilDilation => "PupilDilation",
        }
    }

    /// Full OSC address, e.g. `/avatar/parameters/v2/EyeLeftX`.
    pub fn path(self) -> String {
        format!("{}{}", NAMESPACE, self.name())
    }

    /// Resolve an OSC address. Anything outside the fixed table is `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.strip_prefix(NAMESPACE)?;
        Param::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn slot(self) -> Slot {
        match self {
            Param::EyeLeftX => Slot::PairedA,
            Param::EyeRightX => Slot::PairedB,
            Param::EyeLeftY => Slot::Aux(AuxField::LeftY),
            Param::EyeRightY => Slot::Aux(AuxField::RightY),
            Param::EyeLidLeft => Slot::Aux(AuxField::LeftLid),
            Param::EyeLidRight => Slot::Aux(AuxField::RightLid),
            Param::PupilDilation => Slot::Aux(AuxField::PupilDilation),
        }
    }
}
