//! Stockfish engine session using UCI protocol (async I/O)
//!
//! A session owns exactly one engine process from `open` to `close`. Every
//! search is bounded by a timeout; a timed-out or interrupted search leaves the
//! engine mid-output, so the next search first resynchronizes with
//! `stop` / `isready`. An engine that exits or closes its pipes is reported as
//! `EngineUnavailable`, never as a failed search.

use std::time::Duration;

use shakmaty::Chess;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::board_utils;
use crate::error::AnalysisError;

/// Centipawn value a forced mate is folded into.
pub const MATE_SCORE: i32 = 10_000;

/// How long `close` waits for the engine to exit after `quit`.
const QUIT_GRACE: Duration = Duration::from_secs(2);

/// Result of a single position evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Centipawns relative to the side to move, mates folded in
    pub score: i32,
    /// Principal variation in UCI notation, best move first
    pub best_line: Vec<String>,
}

impl Evaluation {
    pub fn best_move(&self) -> Option<&str> {
        self.best_line.first().map(String::as_str)
    }
}

/// Something that can score a position at a fixed depth.
///
/// One call in flight at a time; `close` must be called once the caller is
/// done, on every exit path.
#[allow(async_fn_in_trait)]
pub trait PositionEvaluator {
    async fn evaluate(&mut self, position: &Chess, depth: u32) -> Result<Evaluation, AnalysisError>;

    async fn close(&mut self);
}

/// Opens fresh evaluator sessions, one per game.
#[allow(async_fn_in_trait)]
pub trait EngineLauncher {
    type Session: PositionEvaluator;

    async fn open(&self) -> Result<Self::Session, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
    /// Bound on the handshake and on each search
    pub timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 128,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Launches `program args...` as a UCI engine.
#[derive(Debug, Clone)]
pub struct StockfishLauncher {
    pub program: String,
    pub args: Vec<String>,
    pub options: EngineOptions,
}

impl StockfishLauncher {
    pub fn new(program: impl Into<String>, options: EngineOptions) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            options,
        }
    }
}

impl EngineLauncher for StockfishLauncher {
    type Session = StockfishSession;

    async fn open(&self) -> Result<StockfishSession, AnalysisError> {
        StockfishSession::open(&self.program, &self.args, &self.options).await
    }
}

struct EngineIo {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Stockfish engine session
pub struct StockfishSession {
    io: Option<EngineIo>,
    timeout: Duration,
    needs_resync: bool,
}

impl StockfishSession {
    /// Spawn the engine and complete the UCI handshake.
    pub async fn open(
        program: &str,
        args: &[String],
        options: &EngineOptions,
    ) -> Result<Self, AnalysisError> {
        let mut process = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AnalysisError::EngineUnavailable(format!("Failed to spawn {program}: {e}"))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::EngineUnavailable("engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::EngineUnavailable("engine stdout not captured".into()))?;

        let mut session = Self {
            io: Some(EngineIo {
                process,
                stdin,
                stdout: BufReader::new(stdout),
            }),
            timeout: options.timeout,
            needs_resync: false,
        };

        let handshake = tokio::time::timeout(options.timeout, session.handshake(options)).await;
        match handshake {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => {
                session.close().await;
                Err(AnalysisError::EngineUnavailable(format!("UCI handshake failed: {e}")))
            }
            Err(_) => {
                session.close().await;
                Err(AnalysisError::EngineUnavailable(format!(
                    "UCI handshake did not finish within {:?}",
                    options.timeout
                )))
            }
        }
    }

    async fn handshake(&mut self, options: &EngineOptions) -> Result<(), AnalysisError> {
        self.send("uci").await?;
        self.wait_for("uciok").await?;

        self.send(&format!("setoption name Threads value {}", options.threads)).await?;
        self.send(&format!("setoption name Hash value {}", options.hash_mb)).await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    pub fn is_open(&self) -> bool {
        self.io.is_some()
    }

    fn io(&mut self) -> Result<&mut EngineIo, AnalysisError> {
        self.io
            .as_mut()
            .ok_or_else(|| AnalysisError::EngineUnavailable("session is closed".into()))
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), AnalysisError> {
        debug!(cmd, "SF <");
        let io = self.io()?;
        io.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| AnalysisError::EngineUnavailable(format!("Failed to write to engine: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| AnalysisError::EngineUnavailable(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, AnalysisError> {
        let io = self.io()?;
        let mut line = String::new();
        let read = io
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| AnalysisError::EngineUnavailable(format!("Failed to read from engine: {e}")))?;
        if read == 0 {
            let status = match io.process.try_wait() {
                Ok(Some(status)) => format!(" ({status})"),
                _ => String::new(),
            };
            return Err(AnalysisError::EngineUnavailable(format!(
                "engine closed its output{status}"
            )));
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "SF >");
        Ok(trimmed)
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), AnalysisError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    /// Drain whatever an interrupted search left behind.
    async fn resync(&mut self) -> Result<(), AnalysisError> {
        self.send("stop").await?;
        self.send("isready").await?;
        tokio::time::timeout(self.timeout, self.wait_for("readyok"))
            .await
            .map_err(|_| AnalysisError::EvaluationFailed("engine did not resynchronize".into()))??;
        self.needs_resync = false;
        Ok(())
    }

    /// Search a FEN to `depth` and return the final score and principal variation.
    pub async fn evaluate_fen(&mut self, fen: &str, depth: u32) -> Result<Evaluation, AnalysisError> {
        self.io()?;
        if self.needs_resync {
            self.resync().await?;
        }

        // Cleared only once `bestmove` has been read; a dropped or failed
        // search leaves the flag set for the next call.
        self.needs_resync = true;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let timeout = self.timeout;
        let search = match tokio::time::timeout(timeout, self.read_search()).await {
            Ok(search) => search?,
            Err(_) => {
                warn!(fen, depth, "Engine search timed out");
                return Err(AnalysisError::EvaluationFailed(format!(
                    "no bestmove within {timeout:?}"
                )));
            }
        };
        self.needs_resync = false;

        let score = search
            .score()
            .ok_or_else(|| AnalysisError::EvaluationFailed(format!("engine returned no score for {fen}")))?;

        let mut best_line = search.pv;
        if best_line.is_empty() {
            if let Some(best) = search.best_move {
                best_line.push(best);
            }
        }

        Ok(Evaluation { score, best_line })
    }

    async fn read_search(&mut self) -> Result<SearchOutput, AnalysisError> {
        let mut out = SearchOutput::default();
        loop {
            let line = self.read_line().await?;
            if line.starts_with("info") && !line.starts_with("info string") {
                if let Some(cp) = parse_cp(&line) {
                    out.cp = Some(cp);
                    out.mate = None;
                }
                if let Some(mate) = parse_mate(&line) {
                    out.mate = Some(mate);
                    out.cp = None;
                }
                if line.contains(" pv ") {
                    out.pv = parse_pv(&line);
                }
            } else if line.starts_with("bestmove") {
                out.best_move = parse_bestmove(&line);
                return Ok(out);
            }
        }
    }

    /// Send `quit`, wait briefly, kill if still running. Safe to call twice.
    pub async fn close(&mut self) {
        let Some(mut io) = self.io.take() else {
            return;
        };

        let _ = io.stdin.write_all(b"quit\n").await;
        let _ = io.stdin.flush().await;
        drop(io.stdin);

        match tokio::time::timeout(QUIT_GRACE, io.process.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Engine exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for engine exit"),
            Err(_) => {
                warn!("Engine ignored quit, killing");
                let _ = io.process.kill().await;
            }
        }
    }
}

impl PositionEvaluator for StockfishSession {
    async fn evaluate(&mut self, position: &Chess, depth: u32) -> Result<Evaluation, AnalysisError> {
        let fen = board_utils::fen(position);
        self.evaluate_fen(&fen, depth).await
    }

    async fn close(&mut self) {
        StockfishSession::close(self).await;
    }
}

impl Drop for StockfishSession {
    fn drop(&mut self) {
        if let Some(io) = self.io.as_mut() {
            warn!("Engine session dropped without close, killing process");
            let _ = io.process.start_kill();
        }
    }
}

#[derive(Debug, Default)]
struct SearchOutput {
    cp: Option<i32>,
    mate: Option<i32>,
    pv: Vec<String>,
    best_move: Option<String>,
}

impl SearchOutput {
    fn score(&self) -> Option<i32> {
        match (self.cp, self.mate) {
            (_, Some(mate)) => Some(mate_to_cp(mate)),
            (Some(cp), None) => Some(cp),
            (None, None) => None,
        }
    }
}

/// Fold "mate in n" into centipawns. `mate 0` means the side to move is mated.
pub fn mate_to_cp(mate: i32) -> i32 {
    if mate > 0 {
        MATE_SCORE - mate
    } else {
        -MATE_SCORE - mate
    }
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "cp" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "mate" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

/// Parse `bestmove e2e4 [ponder e7e5]`; `(none)` means no legal move.
fn parse_bestmove(line: &str) -> Option<String> {
    line.split_whitespace()
        .nth(1)
        .filter(|m| *m != "(none)")
        .map(String::from)
}
