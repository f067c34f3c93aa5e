/// Which diagnostic dumps are on. At most one category at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugFlags {
    pub fft: bool,
    pub autoscale: bool,
    pub render: bool,
}

/// Single-character commands read from the serial console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugCommand {
    DisableAll,
    Autoscale,
    Fft,
    Render,
    PrintBins,
    Calibrate,
}

impl DebugCommand {
    pub fn parse(c: char) -> Option<Self> {
        match c {
            'd' => Some(Self::DisableAll),
            's' => Some(Self::Autoscale),
            'f' => Some(Self::Fft),
            'r' => Some(Self::Render),
            'b' => Some(Self::PrintBins),
            'c' => Some(Self::Calibrate),
            _ => None,
        }
    }
}

impl DebugFlags {
    /// Applies a category command. Returns false for commands that are not debug categories.
    pub fn apply(&mut self, command: DebugCommand) -> bool {
        let next = match command {
            DebugCommand::DisableAll => {
                log::info!("Disabling debug messages.");
                Self::default()
            }
            DebugCommand::Autoscale => {
                log::info!("Enabling scale debug");
                Self {
                    autoscale: true,
                    ..Self::default()
                }
            }
            DebugCommand::Fft => {
                log::info!("Enabling FFT debug");
                Self {
                    fft: true,
                    ..Self::default()
                }
            }
            DebugCommand::Render => {
                log::info!("Enabling render debug");
                Self {
                    render: true,
                    ..Self::default()
                }
            }
            DebugCommand::PrintBins | DebugCommand::Calibrate => return false,
        };
        *self = next;
        true
    }
}
