use log::{debug, warn};

use crate::connection::Connection;
use crate::error::LinkError;
use crate::line::Line;
use crate::proto::command::Command;
use crate::proto::parser::format_command;
use crate::sink::Transcript;

/// Turns typed commands into wire lines on a borrowed connection.
///
/// Fire and forget: replies come back through the reader like any other
/// line and are never matched to the command that caused them.
pub struct Dispatcher<'a> {
    conn: &'a mut Connection,
    transcript: &'a mut dyn Transcript,
}

impl<'a> Dispatcher<'a> {
    pub fn new(conn: &'a mut Connection, transcript: &'a mut dyn Transcript) -> Self {
        Self { conn, transcript }
    }

    /// Echo `> <command>`, then write it. A failed write is shown once and
    /// the session carries on; without a connection nothing is written.
    pub fn send(&mut self, cmd: &Command) {
        let line = format_command(cmd);
        let payload = line.trim_end_matches('\n');
        self.transcript.append(&Line::local(format!("> {payload}")));

        match self.conn.transmit(line.as_bytes()) {
            Ok(()) => debug!("sent {payload:?}"),
            Err(LinkError::NotConnected) => debug!("not connected, dropped {payload:?}"),
            Err(e) => {
                warn!("write {payload:?}: {e}");
                self.transcript.append(&Line::error(format_args!("write: {e}")));
            }
        }
    }

    pub fn send_all<'c>(&mut self, cmds: impl IntoIterator<Item = &'c Command>) {
        for cmd in cmds {
            self.send(cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::command::{Action, Param, Scene};
    use crate::queue::event_queue;
    use crate::testutil::FakeLink;

    /// Records how many bytes had reached the device when each line was shown.
    struct Snapshots {
        link: FakeLink,
        seen: Vec<(String, usize)>,
    }

    impl Transcript for Snapshots {
        fn append(&mut self, line: &Line) {
            self.seen.push((line.text.clone(), self.link.written_len()));
        }
    }

    fn connected() -> (FakeLink, Connection) {
        let link = FakeLink::new();
        let (tx, _rx) = event_queue();
        let mut conn = Connection::new(Box::new(link.clone()), tx);
        conn.connect("fake0", &mut Vec::<Line>::new()).unwrap();
        (link, conn)
    }

    #[test]
    fn bright_is_echoed_before_it_is_written() {
        let (link, mut conn) = connected();
        let before = link.written_len();
        let mut log = Snapshots {
            link: link.clone(),
            seen: Vec::new(),
        };

        Dispatcher::new(&mut conn, &mut log).send(&Command::Set(Param::Bright, 7));

        assert_eq!(log.seen, [("> BRIGHT 7".to_string(), before)]);
        assert_eq!(&link.written()[before..], b"BRIGHT 7\n");
    }

    #[test]
    fn sends_each_command_family() {
        let (link, mut conn) = connected();
        let before = link.written_len();
        let mut transcript: Vec<Line> = Vec::new();

        let cmds = [
            Command::Set(Param::Hold, 5000),
            Command::Action(Action::LogOn),
            Command::Scene(Scene::ExitHole),
            Command::Raw("STATE COOLDOWN".into()),
        ];
        Dispatcher::new(&mut conn, &mut transcript).send_all(&cmds);

        assert_eq!(
            &link.written()[before..],
            b"HOLD 5000\nLOG ON\nSCENE EXITHOLE\nSTATE COOLDOWN\n"
        );
        let echoes: Vec<_> = transcript.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            echoes,
            ["> HOLD 5000", "> LOG ON", "> SCENE EXITHOLE", "> STATE COOLDOWN"]
        );
    }

    #[test]
    fn write_failure_is_logged_and_session_survives() {
        let (link, mut conn) = connected();
        let mut transcript: Vec<Line> = Vec::new();

        link.set_fail_writes(true);
        Dispatcher::new(&mut conn, &mut transcript).send(&Command::Action(Action::Save));
        link.set_fail_writes(false);
        Dispatcher::new(&mut conn, &mut transcript).send(&Command::Action(Action::Load));

        let texts: Vec<_> = transcript.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            ["> SAVE", "[ERROR] write: device unplugged", "> LOAD"]
        );
        assert!(conn.is_connected());
        assert!(link.written().ends_with(b"LOAD\n"));
    }

    #[test]
    fn disconnected_send_only_echoes() {
        let link = FakeLink::new();
        let (tx, _rx) = event_queue();
        let mut conn = Connection::new(Box::new(link.clone()), tx);
        let mut transcript: Vec<Line> = Vec::new();

        Dispatcher::new(&mut conn, &mut transcript).send(&Command::Action(Action::Map));

        assert_eq!(transcript, [Line::local("> MAP")]);
        assert!(link.written().is_empty());
    }
}
