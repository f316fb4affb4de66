/// Command interpreter behind the REPL.
///
/// One line in, zero or more reply lines out. Every failure is reported as a
/// single `ERR ...` line and the shell carries on; only `EXIT`/`QUIT` stop it.
/// Write commands need a selected session (`CREATE` or `USE` first).
use anyhow::{anyhow, bail, Context, Result};
use std::io::{self, Write};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use store::{DataStore, Session, StreamKind, Value};

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub const HELP: &str = "\
Commands: CREATE [t] [json] | USE id | SESSIONS | DELETE | STATS
          SPECTRUM w t l1,l2,.. | AUDIO w t ch | TEMP w t v
          NAME w t ch text | TEXT w t ch text | ERROR w t message
          ITER kind w [start|-] [end|-] | SETTINGS GET name [json] | SETTINGS SET name json
          EXIT";

pub struct Shell {
    store: DataStore,
    current: Option<Session>,
}

impl Shell {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Id of the selected session.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().and_then(Session::id)
    }

    /// Runs one command line, writing replies to `out`.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = parts.collect();
        let cmd = cmd.to_uppercase();

        if cmd == "EXIT" || cmd == "QUIT" {
            writeln!(out, "bye")?;
            return Ok(Flow::Exit);
        }

        if let Err(e) = self.dispatch(&cmd, &args, out) {
            writeln!(out, "ERR {:#}", e)?;
        }
        Ok(Flow::Continue)
    }

    fn dispatch<W: Write>(&mut self, cmd: &str, args: &[&str], out: &mut W) -> Result<()> {
        match cmd {
            "CREATE" => self.create(args, out),
            "USE" => self.use_session(args, out),
            "SESSIONS" => self.list_sessions(out),
            "DELETE" => self.delete(out),
            "STATS" => self.stats(out),
            "SETTINGS" => self.settings(args, out),
            "SPECTRUM" => {
                let [worker, t, levels] = exact::<3>(args, "SPECTRUM worker t l1,l2,...")?;
                let t = parse_timestamp(t)?;
                let levels = levels
                    .split(',')
                    .map(|l| l.trim().parse::<i8>().with_context(|| format!("bad level '{}'", l)))
                    .collect::<Result<Vec<_>>>()?;
                self.session_mut()?.write_spectrum(worker, t, &levels)?;
                writeln!(out, "OK")?;
                Ok(())
            }
            "AUDIO" => {
                let [worker, t, channel] = exact::<3>(args, "AUDIO worker t channel")?;
                let (t, channel) = (parse_timestamp(t)?, parse_channel(channel)?);
                let path = self.session_mut()?.write_audio(worker, t, channel)?;
                writeln!(out, "{}", path.display())?;
                Ok(())
            }
            "TEMP" => {
                let [worker, t, value] = exact::<3>(args, "TEMP worker t value")?;
                let t = parse_timestamp(t)?;
                let value: f32 = value
                    .parse()
                    .with_context(|| format!("bad temperature '{}'", value))?;
                self.session_mut()?.write_temperature(worker, t, value)?;
                writeln!(out, "OK")?;
                Ok(())
            }
            "NAME" | "TEXT" => {
                if args.len() < 3 {
                    bail!("usage: {} worker t channel text...", cmd);
                }
                let (worker, t, channel) = (args[0], parse_timestamp(args[1])?, parse_channel(args[2])?);
                let text = args[3..].join(" ");
                let session = self.session_mut()?;
                if cmd == "NAME" {
                    session.write_rds_name(worker, t, channel, &text)?;
                } else {
                    session.write_rds_text(worker, t, channel, &text)?;
                }
                writeln!(out, "OK")?;
                Ok(())
            }
            "ERROR" => {
                if args.len() < 3 {
                    bail!("usage: ERROR worker t message...");
                }
                let (worker, t) = (args[0], parse_timestamp(args[1])?);
                self.session_mut()?.write_error(worker, t, &args[2..].join(" "))?;
                writeln!(out, "OK")?;
                Ok(())
            }
            "ITER" => self.iter(args, out),
            "HELP" => {
                writeln!(out, "{}", HELP)?;
                Ok(())
            }
            other => bail!("unknown command: {}", other),
        }
    }

    fn session(&self) -> Result<&Session> {
        self.current
            .as_ref()
            .ok_or_else(|| anyhow!("no session selected (CREATE or USE first)"))
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.current
            .as_mut()
            .ok_or_else(|| anyhow!("no session selected (CREATE or USE first)"))
    }

    fn create<W: Write>(&mut self, args: &[&str], out: &mut W) -> Result<()> {
        let timestamp = match args.first() {
            Some(t) => parse_timestamp(t)?,
            None => now_millis()?,
        };
        let values = match args.get(1..) {
            Some(rest) if !rest.is_empty() => parse_json(&rest.join(" "))?,
            _ => Value::Object(Default::default()),
        };
        let session = self.store.create_session(timestamp, values)?;
        writeln!(out, "OK {}", session.id().unwrap_or_default())?;
        self.current = Some(session);
        Ok(())
    }

    fn use_session<W: Write>(&mut self, args: &[&str], out: &mut W) -> Result<()> {
        let [id] = exact::<1>(args, "USE id")?;
        let session = self.store.open_session(id)?;
        writeln!(
            out,
            "OK {} (workers={}, spectrum={})",
            id,
            session.workers()?.len(),
            session.spectrum_count()?
        )?;
        self.current = Some(session);
        Ok(())
    }

    fn list_sessions<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let mut n = 0usize;
        for session in self.store.iter_sessions(None)? {
            match session {
                Ok(s) => {
                    writeln!(
                        out,
                        "{} first={} latest={} spectrum={}",
                        s.id().unwrap_or_default(),
                        fmt_opt(s.first()?),
                        fmt_opt(s.latest()?),
                        s.spectrum_count()?
                    )?;
                    n += 1;
                }
                Err(e) => writeln!(out, "ERR {}", e)?,
            }
        }
        if n == 0 {
            writeln!(out, "(empty)")?;
        } else {
            writeln!(out, "({} sessions)", n)?;
        }
        Ok(())
    }

    fn delete<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let session = self.session_mut()?;
        let id = session.id().unwrap_or_default().to_string();
        session.delete()?;
        self.current = None;
        writeln!(out, "OK deleted {}", id)?;
        Ok(())
    }

    fn stats<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let stats = self.store.stats()?;
        writeln!(
            out,
            "samples={}B data={}B free={}",
            stats.samples_bytes,
            stats.data_bytes,
            stats
                .free_bytes
                .map_or_else(|| "unknown".to_string(), |b| format!("{}B", b))
        )?;
        if let Some(session) = &self.current {
            writeln!(out, "session={}", session.id().unwrap_or_default())?;
            for (worker, w) in session.workers()? {
                writeln!(
                    out,
                    "  {} first={} latest={} spectrum={}",
                    worker,
                    fmt_opt(w.first),
                    fmt_opt(w.latest),
                    w.spectrum_count
                )?;
            }
        }
        Ok(())
    }

    fn settings<W: Write>(&mut self, args: &[&str], out: &mut W) -> Result<()> {
        let (Some(op), Some(name)) = (args.first(), args.get(1)) else {
            bail!("usage: SETTINGS GET name [json] | SETTINGS SET name json");
        };
        let rest = args[2..].join(" ");
        match op.to_uppercase().as_str() {
            "GET" => {
                let defaults = if rest.is_empty() {
                    None
                } else {
                    Some(parse_json(&rest)?)
                };
                let values = self.store.settings().read(name, defaults.as_ref())?;
                writeln!(out, "{}", values)?;
            }
            "SET" => {
                if rest.is_empty() {
                    bail!("usage: SETTINGS SET name json");
                }
                self.store.settings().write(name, &parse_json(&rest)?)?;
                writeln!(out, "OK")?;
            }
            other => bail!("unknown SETTINGS operation: {}", other),
        }
        Ok(())
    }

    fn iter<W: Write>(&mut self, args: &[&str], out: &mut W) -> Result<()> {
        if args.len() < 2 || args.len() > 4 {
            bail!("usage: ITER kind worker [start|-] [end|-]");
        }
        let kind = StreamKind::from_str(args[0])?;
        let worker = args[1];
        let start = parse_bound(args.get(2))?;
        let end = parse_bound(args.get(3))?;
        let session = self.session()?;

        let lines: Vec<String> = match kind {
            StreamKind::Spectrum => session
                .iter_spectrum(worker, start, end)?
                .map(|r| {
                    r.map(|(t, levels)| {
                        let levels: Vec<String> = levels.iter().map(i8::to_string).collect();
                        format!("{}: {}", t, levels.join(","))
                    })
                })
                .collect::<store::Result<_>>()?,
            StreamKind::Audio => session
                .iter_audio(worker, start, end)?
                .map(|r| r.map(|(t, ch)| format!("{}: channel {}", t, ch)))
                .collect::<store::Result<_>>()?,
            StreamKind::Temperature => session
                .iter_temperature(worker, start, end)?
                .map(|r| r.map(|(t, v)| format!("{}: {}", t, v)))
                .collect::<store::Result<_>>()?,
            StreamKind::RdsName => session
                .iter_rds_name(worker, start, end)?
                .map(|r| r.map(|(t, ch, s)| format!("{}: [{}] {}", t, ch, s)))
                .collect::<store::Result<_>>()?,
            StreamKind::RdsText => session
                .iter_rds_text(worker, start, end)?
                .map(|r| r.map(|(t, ch, s)| format!("{}: [{}] {}", t, ch, s)))
                .collect::<store::Result<_>>()?,
            StreamKind::Error => session
                .iter_error(worker, start, end)?
                .map(|r| r.map(|(t, s)| format!("{}: {}", t, s)))
                .collect::<store::Result<_>>()?,
        };

        for line in &lines {
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "({} records)", lines.len())?;
        Ok(())
    }
}

fn exact<'a, const N: usize>(args: &[&'a str], usage: &str) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| anyhow!("usage: {}", usage))
}

fn parse_timestamp(s: &str) -> Result<u64> {
    s.parse().with_context(|| format!("bad timestamp '{}'", s))
}

fn parse_channel(s: &str) -> Result<u32> {
    s.parse().with_context(|| format!("bad channel '{}'", s))
}

fn parse_bound(s: Option<&&str>) -> Result<Option<u64>> {
    match s {
        None | Some(&"-") => Ok(None),
        Some(s) => parse_timestamp(s).map(Some),
    }
}

fn parse_json(s: &str) -> Result<Value> {
    serde_json::from_str(s).with_context(|| format!("bad JSON '{}'", s))
}

fn now_millis() -> Result<u64> {
    let since = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(since.as_millis() as u64)
}

fn fmt_opt(v: Option<u64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}
