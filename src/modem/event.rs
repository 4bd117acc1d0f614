//! Events reported by the modem library through `get_event`.

/// Status carried by a TX done event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxDoneStatus {
    NotSent,
    Sent,
    Confirmed,
}

impl TxDoneStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Sent,
            2 => Self::Confirmed,
            _ => Self::NotSent,
        }
    }
}

/// Status carried by an upload done event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDoneStatus {
    Aborted,
    Successful,
}

impl UploadDoneStatus {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 1 {
            Self::Successful
        } else {
            Self::Aborted
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aborted => "SMTC_MODEM_EVENT_UPLOAD_DONE_ABORTED",
            Self::Successful => "SMTC_MODEM_EVENT_UPLOAD_DONE_SUCCESSFUL",
        }
    }
}

/// Mute state reported by device management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteStatus {
    NotMuted,
    Muted,
    TemporarilyMuted,
}

impl MuteStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Muted,
            2 => Self::TemporarilyMuted,
            _ => Self::NotMuted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotMuted => "SMTC_MODEM_EVENT_MUTE_OFF",
            Self::Muted => "SMTC_MODEM_EVENT_MUTE_ON",
            Self::TemporarilyMuted => "SMTC_MODEM_EVENT_MUTE_TEMPORARY",
        }
    }
}

/// Time synchronization outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncStatus {
    NotValid,
    Valid,
    ValidButNotSynced,
}

impl TimeSyncStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Valid,
            2 => Self::ValidButNotSynced,
            _ => Self::NotValid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotValid => "SMTC_MODEM_EVENT_TIME_NOT_VALID",
            Self::Valid => "SMTC_MODEM_EVENT_TIME_VALID",
            Self::ValidButNotSynced => "SMTC_MODEM_EVENT_TIME_VALID_BUT_NOT_SYNC",
        }
    }
}

/// Link check answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCheckStatus {
    NotReceived,
    Received,
}

impl LinkCheckStatus {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 1 {
            Self::Received
        } else {
            Self::NotReceived
        }
    }
}

/// Class B ping slot info answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingSlotStatus {
    NotAnswered,
    Answered,
}

impl PingSlotStatus {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 1 {
            Self::Answered
        } else {
            Self::NotAnswered
        }
    }
}

/// Class B operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassBStatus {
    NotReady,
    Ready,
}

impl ClassBStatus {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 1 {
            Self::Ready
        } else {
            Self::NotReady
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotReady => "SMTC_MODEM_EVENT_CLASS_B_NOT_READY",
            Self::Ready => "SMTC_MODEM_EVENT_CLASS_B_READY",
        }
    }
}

/// A single queued modem event.
///
/// Downlink payloads are not part of the event; they are fetched separately
/// with `ModemStack::get_downlink_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemEvent {
    /// Modem reset detected, with the persistent reset counter.
    Reset { count: u16 },
    /// Application alarm expired.
    Alarm,
    /// Network joined.
    Joined,
    /// Join attempt failed.
    JoinFail,
    /// Uplink finished.
    TxDone { status: TxDoneStatus },
    /// Downlink available.
    DownData,
    /// File upload finished.
    UploadDone { status: UploadDoneStatus },
    /// Device management set-conf request.
    SetConf { opcode: u8 },
    /// Mute state changed.
    Mute { status: MuteStatus },
    /// Data stream finished.
    StreamDone,
    /// Time synchronization finished.
    TimeSync { status: TimeSyncStatus },
    /// Link check answer.
    LinkCheck { status: LinkCheckStatus },
    /// Class B ping slot info answer.
    ClassBPingSlotInfo { status: PingSlotStatus },
    /// Class B state changed.
    ClassBStatus { status: ClassBStatus },
    /// Event type without a callback in this crate.
    Unknown { event_type: u8 },
}

impl ModemEvent {
    /// Name used in debug logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reset { .. } => "RESET",
            Self::Alarm => "ALARM",
            Self::Joined => "JOINED",
            Self::JoinFail => "JOIN FAILED",
            Self::TxDone { .. } => "TX DONE",
            Self::DownData => "DOWNLINK",
            Self::UploadDone { .. } => "UPLOAD DONE",
            Self::SetConf { .. } => "SET CONF",
            Self::Mute { .. } => "MUTE",
            Self::StreamDone => "STREAM DONE",
            Self::TimeSync { .. } => "TIME SYNC",
            Self::LinkCheck { .. } => "LINK CHECK",
            Self::ClassBPingSlotInfo { .. } => "CLASS B PING SLOT",
            Self::ClassBStatus { .. } => "CLASS B STATUS",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }
}
