use std::fmt;
use std::ops::RangeInclusive;

/// One line sent to the controller. The newline is added on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `<NAME> <value>`
    Set(Param, u32),
    /// Bare keyword
    Action(Action),
    /// `SCENE <name>`
    Scene(Scene),
    /// Passed through verbatim
    Raw(String),
}

impl Command {
    /// Sent right after connecting so the transcript starts with the
    /// controller's current configuration.
    pub const STATUS_QUERY: Command = Command::Action(Action::Cfg);
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set(param, value) => write!(f, "{} {}", param.name(), value),
            Command::Action(action) => f.write_str(action.name()),
            Command::Scene(scene) => write!(f, "SCENE {}", scene.name()),
            Command::Raw(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Hold,
    Cool,
    Bright,
    SensorDebounce,
    SensorRearm,
}

impl Param {
    pub const ALL: [Param; 5] = [
        Param::Hold,
        Param::Cool,
        Param::Bright,
        Param::SensorDebounce,
        Param::SensorRearm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Param::Hold => "HOLD",
            Param::Cool => "COOL",
            Param::Bright => "BRIGHT",
            Param::SensorDebounce => "SDEB",
            Param::SensorRearm => "SREARM",
        }
    }

    /// Values the controller accepts (ms, except BRIGHT).
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            Param::Hold => 0..=30_000,
            Param::Cool => 0..=600_000,
            Param::Bright => 0..=15,
            Param::SensorDebounce => 0..=2_000,
            Param::SensorRearm => 0..=600_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Cfg,
    Map,
    Save,
    Load,
    LogOn,
    LogOff,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Cfg,
        Action::Map,
        Action::Save,
        Action::Load,
        Action::LogOn,
        Action::LogOff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Cfg => "CFG",
            Action::Map => "MAP",
            Action::Save => "SAVE",
            Action::Load => "LOAD",
            Action::LogOn => "LOG ON",
            Action::LogOff => "LOG OFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    Standby,
    PhoneLoading,
    Intro,
    BloodRoom,
    Graveyard,
    FurRoom,
    OrcaDino,
    FrankenLab,
    MirrorRoom,
    ExitHole,
}

impl Scene {
    pub const ALL: [Scene; 10] = [
        Scene::Standby,
        Scene::PhoneLoading,
        Scene::Intro,
        Scene::BloodRoom,
        Scene::Graveyard,
        Scene::FurRoom,
        Scene::OrcaDino,
        Scene::FrankenLab,
        Scene::MirrorRoom,
        Scene::ExitHole,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scene::Standby => "STANDBY",
            Scene::PhoneLoading => "PHONELOADING",
            Scene::Intro => "INTRO",
            Scene::BloodRoom => "BLOODROOM",
            Scene::Graveyard => "GRAVEYARD",
            Scene::FurRoom => "FURROOM",
            Scene::OrcaDino => "ORCADINO",
            Scene::FrankenLab => "FRANKENLAB",
            Scene::MirrorRoom => "MIRRORROOM",
            Scene::ExitHole => "EXITHOLE",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Scene> {
        Scene::ALL
            .into_iter()
            .find(|scene| scene.name().eq_ignore_ascii_case(name))
    }
}
