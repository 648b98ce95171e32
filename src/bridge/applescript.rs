use super::{BridgeError, BridgeResult, PlayerBridge, PlayerStatus, RepeatMode, TrackInfo};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

const NOT_RUNNING: &str = "__NOT_RUNNING__";
const FIELD_SEPARATOR: char = '\u{1f}';
const TRACK_FIELDS: usize = 10;

/// Drives the Music app by running AppleScript through `osascript`.
///
/// Every script is wrapped in an `is running` guard so that reading state
/// never launches the application as a side effect.
pub struct AppleScriptBridge {
    app_name: String,
    osascript: PathBuf,
    artwork_path: PathBuf,
}

impl AppleScriptBridge {
    pub fn new(app_name: impl Into<String>, osascript: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.into(),
            osascript: osascript.into(),
            artwork_path: std::env::temp_dir().join("music-widget-artwork.bin"),
        }
    }

    fn run_script(&self, script: &str) -> BridgeResult<String> {
        let output = Command::new(&self.osascript)
            .arg("-e")
            .arg(script)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BridgeError::Script(stderr));
        }

        let reply = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        if reply == NOT_RUNNING {
            return Err(BridgeError::NotRunning);
        }
        Ok(reply)
    }

    fn tell(&self, body: &str) -> BridgeResult<String> {
        let app = applescript_escape(&self.app_name);
        let script = format!(
            r#"if application "{app}" is running then
    tell application "{app}"
        {body}
    end tell
else
    return "{NOT_RUNNING}"
end if"#
        );
        self.run_script(&script)
    }

    fn tell_number(&self, field: &'static str, body: &str) -> BridgeResult<f64> {
        let reply = self.tell(body)?;
        parse_number(&reply).ok_or(BridgeError::Parse { field, reply })
    }

    fn tell_bool(&self, field: &'static str, body: &str) -> BridgeResult<bool> {
        let reply = self.tell(body)?;
        parse_bool(&reply).ok_or(BridgeError::Parse { field, reply })
    }
}

impl PlayerBridge for AppleScriptBridge {
    fn is_running(&self) -> BridgeResult<bool> {
        let app = applescript_escape(&self.app_name);
        let reply = self.run_script(&format!(r#"return application "{app}" is running"#))?;
        parse_bool(&reply).ok_or(BridgeError::Parse {
            field: "running",
            reply,
        })
    }

    fn player_status(&self) -> BridgeResult<PlayerStatus> {
        match self.tell("return player state as string") {
            Ok(reply) => Ok(PlayerStatus::from_reply(&reply)),
            Err(BridgeError::NotRunning) => Ok(PlayerStatus::Unknown),
            Err(err) => Err(err),
        }
    }

    fn player_position(&self) -> BridgeResult<f64> {
        self.tell_number(
            "player position",
            r#"if player state is stopped then return "0"
        return player position as string"#,
        )
    }

    fn set_player_position(&mut self, secs: f64) -> BridgeResult<()> {
        self.tell(&format!("set player position to {}", script_number(secs)))
            .map(drop)
    }

    fn track_info(&self) -> BridgeResult<Option<TrackInfo>> {
        let reply = self.tell(
            r#"if player state is stopped then return ""
        set t to current track
        set sep to (ASCII character 31)
        set lv to false
        try
            set lv to loved of t
        end try
        set da to ""
        try
            set da to (date added of t) as string
        end try
        set pd to ""
        try
            set pd to (played date of t) as string
        end try
        return (name of t) & sep & (artist of t) & sep & (album of t) & sep & (track number of t as string) & sep & (duration of t as string) & sep & (lv as string) & sep & (rating of t as string) & sep & da & sep & pd & sep & (played count of t as string)"#,
        )?;
        parse_track_info(&reply)
    }

    fn track_in_library(&self) -> BridgeResult<bool> {
        self.tell_bool(
            "track in library",
            r#"if player state is stopped then return "false"
        set c to class of current track
        return (c is file track or c is shared track) as string"#,
        )
    }

    fn track_duration(&self) -> BridgeResult<f64> {
        self.tell_number(
            "duration",
            r#"if player state is stopped then return "0"
        return duration of current track as string"#,
        )
    }

    fn sound_volume(&self) -> BridgeResult<f64> {
        self.tell_number("sound volume", "return sound volume as string")
    }

    fn set_sound_volume(&mut self, volume: f64) -> BridgeResult<()> {
        let volume = volume.clamp(0.0, 100.0).round() as i64;
        self.tell(&format!("set sound volume to {volume}")).map(drop)
    }

    fn set_loved(&mut self, loved: bool) -> BridgeResult<()> {
        self.tell(&format!("set loved of current track to {loved}"))
            .map(drop)
    }

    fn set_rating(&mut self, rating: u8) -> BridgeResult<()> {
        self.tell(&format!("set rating of current track to {}", rating.min(100)))
            .map(drop)
    }

    fn shuffle_enabled(&self) -> BridgeResult<bool> {
        self.tell_bool("shuffle", "return shuffle enabled as string")
    }

    fn toggle_shuffle(&mut self) -> BridgeResult<()> {
        self.tell("set shuffle enabled to not shuffle enabled")
            .map(drop)
    }

    fn song_repeat(&self) -> BridgeResult<RepeatMode> {
        let reply = self.tell("return song repeat as string")?;
        RepeatMode::from_reply(&reply).ok_or(BridgeError::Parse {
            field: "song repeat",
            reply,
        })
    }

    fn toggle_song_repeat(&mut self) -> BridgeResult<()> {
        self.tell(
            r#"if song repeat is off then
            set song repeat to all
        else if song repeat is all then
            set song repeat to one
        else
            set song repeat to off
        end if"#,
        )
        .map(drop)
    }

    fn artwork_data(&self) -> BridgeResult<Option<Vec<u8>>> {
        let target = applescript_escape(&self.artwork_path.to_string_lossy());
        let reply = self.tell(&format!(
            r#"if player state is stopped then return "none"
        if (count of artworks of current track) is 0 then return "none"
        set art to raw data of artwork 1 of current track
        set f to open for access (POSIX file "{target}") with write permission
        try
            set eof f to 0
            write art to f
            close access f
        on error errText
            close access f
            error errText
        end try
        return "saved""#
        ))?;

        match reply.trim() {
            "none" => Ok(None),
            "saved" => read_artwork_file(&self.artwork_path),
            _ => Err(BridgeError::Parse {
                field: "artwork",
                reply,
            }),
        }
    }

    fn favorited_playlists(&self) -> BridgeResult<Vec<String>> {
        let reply = self.tell(
            r#"set out to ""
        repeat with p in (every user playlist whose favorited is true)
            set out to out & (name of p) & linefeed
        end repeat
        return out"#,
        )?;
        Ok(reply
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn play_playlist(&mut self, name: &str) -> BridgeResult<()> {
        let name = applescript_escape(name);
        self.tell(&format!(r#"play playlist "{name}""#)).map(drop)
    }

    fn play_pause(&mut self) -> BridgeResult<()> {
        self.tell("playpause").map(drop)
    }

    fn previous_track(&mut self) -> BridgeResult<()> {
        self.tell("previous track").map(drop)
    }

    fn next_track(&mut self) -> BridgeResult<()> {
        self.tell("next track").map(drop)
    }
}

fn read_artwork_file(path: &Path) -> BridgeResult<Option<Vec<u8>>> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(bytes))
    }
}

fn parse_track_info(reply: &str) -> BridgeResult<Option<TrackInfo>> {
    if reply.trim().is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = reply.split(FIELD_SEPARATOR).collect();
    if fields.len() != TRACK_FIELDS {
        return Err(BridgeError::Parse {
            field: "track info",
            reply: reply.to_string(),
        });
    }

    let optional = |value: &str| {
        let value = value.trim();
        (!value.is_empty() && value != "missing value").then(|| value.to_string())
    };

    Ok(Some(TrackInfo {
        name: fields[0].to_string(),
        artist: fields[1].to_string(),
        album: fields[2].to_string(),
        track_number: parse_number(fields[3]).unwrap_or(0.0).max(0.0) as u32,
        duration_secs: parse_number(fields[4]).unwrap_or(0.0).max(0.0),
        loved: parse_bool(fields[5]).unwrap_or(false),
        rating: parse_number(fields[6]).unwrap_or(0.0).clamp(0.0, 100.0).round() as u8,
        date_added: optional(fields[7]),
        date_played: optional(fields[8]),
        play_count: parse_number(fields[9]).unwrap_or(0.0).max(0.0) as u32,
    }))
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

/// AppleScript always accepts a dot as decimal separator in source text.
fn script_number(value: f64) -> String {
    let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
    format!("{value:.3}")
}

/// Numbers come back formatted with the user's locale, so `3,5` and `3.5`
/// must both parse.
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "missing value" {
        return None;
    }
    // The last separator is the decimal point; any earlier one groups digits.
    let decimal = trimmed.rfind(|c: char| c == ',' || c == '.');
    let mut text = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.char_indices() {
        if Some(i) == decimal {
            text.push('.');
        } else if c.is_ascii_digit() || matches!(c, '-' | '+' | 'e' | 'E') {
            text.push(c);
        }
    }
    text.parse().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
