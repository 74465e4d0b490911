//! Event-driven UCI engine.
//!
//! A reader thread turns input lines into commands, the search thread
//! reports progress, and both feed one channel drained by the main loop,
//! which alone writes protocol output.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use tracing::{debug, info, warn};

use quiver_board::eval::DEFAULT_TEMPO;
use quiver_board::{ChessEvaluator, ChessPosition};
use quiver_engine::score::mate_distance;
use quiver_engine::search::{MAX_HASH_MB, MIN_HASH_MB};
use quiver_engine::{Move, SearchEvent, SearchLimits, SearchReport, SearchResult, SearchThread, Searcher};

use crate::command::{Command, GoParams, UciOption, parse_command};
use crate::error::UciError;

/// Settings adjustable through `setoption`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub hash_mb: usize,
    pub move_overhead: Duration,
    pub tempo: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: 16,
            move_overhead: Duration::from_millis(10),
            tempo: DEFAULT_TEMPO,
        }
    }
}

enum EngineEvent {
    Input(Result<Command, UciError>),
    Search(SearchEvent),
    InputClosed,
}

/// The UCI engine: current position, search thread and configuration.
pub struct UciEngine<W: Write> {
    out: W,
    position: ChessPosition,
    thread: SearchThread,
    config: EngineConfig,
    searching: bool,
    infinite: bool,
    /// Option changes received mid-search, applied once it ends.
    pending: Vec<UciOption>,
    pending_new_game: bool,
}

impl UciEngine<io::Stdout> {
    /// Engine talking on standard output.
    pub fn stdout(config: EngineConfig) -> Result<Self, UciError> {
        Self::new(io::stdout(), config)
    }

    /// Serve standard input until `quit` or end of input.
    pub fn run(self) -> Result<(), UciError> {
        self.run_with(BufReader::new(io::stdin())).map(|_| ())
    }
}

impl<W: Write> UciEngine<W> {
    pub fn new(out: W, config: EngineConfig) -> Result<Self, UciError> {
        let mut searcher = Searcher::new(config.hash_mb)?;
        searcher.set_move_overhead(config.move_overhead);
        Ok(Self {
            out,
            position: ChessPosition::startpos(),
            thread: SearchThread::new(searcher),
            config,
            searching: false,
            infinite: false,
            pending: Vec::new(),
            pending_new_game: false,
        })
    }

    /// Serve `input` until `quit` or end of input, then hand the output back.
    pub fn run_with<R: BufRead + Send + 'static>(mut self, input: R) -> Result<W, UciError> {
        let (tx, rx) = mpsc::channel();
        spawn_reader(input, tx.clone());

        while let Ok(event) = rx.recv() {
            match event {
                EngineEvent::Input(Ok(Command::Quit)) => {
                    self.shutdown(&rx, true);
                    break;
                }
                // A bounded search still gets to finish after end of input.
                EngineEvent::InputClosed => {
                    self.shutdown(&rx, self.infinite);
                    break;
                }
                EngineEvent::Input(Ok(cmd)) => self.handle(cmd, &tx),
                EngineEvent::Input(Err(e)) => warn!(error = %e, "bad UCI input"),
                EngineEvent::Search(event) => self.on_search_event(event),
            }
        }

        info!("quiver shutting down");
        Ok(self.out)
    }

    fn handle(&mut self, cmd: Command, tx: &Sender<EngineEvent>) {
        match cmd {
            Command::Uci => self.identify(),
            Command::IsReady => self.send("readyok"),
            Command::UciNewGame => self.new_game(),
            Command::SetOption(option) => self.set_option(option),
            Command::Position(pos) => self.position = *pos,
            Command::Go(params) => self.go(&params, tx),
            Command::Stop => self.thread.stop(),
            Command::Quit => {}
            Command::Unknown(word) if !word.is_empty() => debug!(%word, "ignoring unknown command"),
            Command::Unknown(_) => {}
        }
    }

    fn identify(&mut self) {
        self.send("id name quiver");
        self.send("id author the quiver developers");
        let lines = [
            format!("option name Hash type spin default 16 min {MIN_HASH_MB} max {MAX_HASH_MB}"),
            "option name Clear Hash type button".to_owned(),
            "option name Move Overhead type spin default 10 min 0 max 5000".to_owned(),
            format!("option name Tempo type spin default {DEFAULT_TEMPO} min 0 max 100"),
            "uciok".to_owned(),
        ];
        for line in &lines {
            self.send(line);
        }
    }

    fn new_game(&mut self) {
        self.position = ChessPosition::startpos();
        if self.searching {
            self.pending_new_game = true;
        } else {
            self.thread.searcher().new_game();
        }
    }

    fn set_option(&mut self, option: UciOption) {
        if self.searching {
            self.pending.push(option);
            return;
        }
        debug!(?option, "setoption");
        match option {
            UciOption::Hash(mb) => match self.thread.searcher().resize_tt(mb) {
                Ok(()) => self.config.hash_mb = mb,
                Err(e) => warn!(error = %e, "Hash not changed"),
            },
            UciOption::ClearHash => self.thread.searcher().clear_tt(),
            UciOption::MoveOverhead(overhead) => {
                self.config.move_overhead = overhead;
                self.thread.searcher().set_move_overhead(overhead);
            }
            UciOption::Tempo(tempo) => self.config.tempo = tempo,
        }
    }

    fn go(&mut self, params: &GoParams, tx: &Sender<EngineEvent>) {
        if self.searching {
            warn!("go received while searching, ignoring");
            return;
        }
        let tx = tx.clone();
        let limits = params.limits();
        self.infinite = limits.infinite || limits == SearchLimits::default();
        let started = self.thread.start(
            self.position.clone(),
            ChessEvaluator::new(self.config.tempo),
            limits,
            move |event| {
                let _ = tx.send(EngineEvent::Search(event));
            },
        );
        match started {
            Ok(()) => self.searching = true,
            Err(e) => {
                warn!(error = %e, "could not start search");
                self.send("bestmove 0000");
            }
        }
    }

    fn on_search_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Iteration(report) => {
                let line = info_line(&report);
                self.send(&line);
            }
            SearchEvent::Progress { nodes, nps, elapsed, hashfull } => {
                let line = format!(
                    "info nodes {nodes} nps {nps} hashfull {hashfull} time {}",
                    elapsed.as_millis()
                );
                self.send(&line);
            }
            SearchEvent::Finished(result) => self.finish(result),
        }
    }

    fn finish(&mut self, reported: SearchResult) {
        let result = match self.thread.wait() {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "search thread did not finish cleanly");
                reported
            }
        };
        self.searching = false;

        let line = bestmove_line(result.best_move, result.ponder_move);
        self.send(&line);

        if std::mem::take(&mut self.pending_new_game) {
            self.thread.searcher().new_game();
        }
        for option in std::mem::take(&mut self.pending) {
            self.set_option(option);
        }
    }

    /// Let a running search report its move before exiting, stopping it
    /// first if asked to.
    fn shutdown(&mut self, rx: &Receiver<EngineEvent>, stop: bool) {
        if !self.searching {
            return;
        }
        if stop {
            self.thread.stop();
        }
        while let Ok(event) = rx.recv() {
            if let EngineEvent::Search(event) = event {
                let done = matches!(event, SearchEvent::Finished(_));
                self.on_search_event(event);
                if done {
                    break;
                }
            }
        }
    }

    fn send(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(error = %e, "failed to write protocol output");
        }
    }
}

fn spawn_reader<R: BufRead + Send + 'static>(input: R, tx: Sender<EngineEvent>) {
    let spawned = std::thread::Builder::new()
        .name("quiver-input".into())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!(cmd = %line, "received");
                if tx.send(EngineEvent::Input(parse_command(line))).is_err() {
                    return;
                }
            }
            let _ = tx.send(EngineEvent::InputClosed);
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not spawn input reader");
    }
}

/// `info depth .. seldepth .. score cp|mate .. nodes .. nps .. hashfull .. time .. pv ..`
pub fn info_line(report: &SearchReport) -> String {
    let score = match mate_distance(report.score) {
        Some(moves) => format!("mate {moves}"),
        None => format!("cp {}", report.score),
    };
    let pv: Vec<String> = report.pv.iter().map(Move::to_string).collect();
    format!(
        "info depth {} seldepth {} score {score} nodes {} nps {} hashfull {} time {} pv {}",
        report.depth,
        report.seldepth,
        report.nodes,
        report.nps,
        report.hashfull,
        report.elapsed.as_millis(),
        pv.join(" ")
    )
}

/// `bestmove <m> [ponder <m>]`, with `0000` when there is no move.
pub fn bestmove_line(best: Move, ponder: Option<Move>) -> String {
    if best.is_null() {
        return "bestmove 0000".to_owned();
    }
    match ponder.filter(|m| !m.is_null()) {
        Some(p) => format!("bestmove {best} ponder {p}"),
        None => format!("bestmove {best}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_engine::score::{mate_in, mated_in};

    fn mv(s: &str) -> Move {
        Move::from_uci(s).unwrap()
    }

    fn report(score: i32) -> SearchReport {
        SearchReport {
            depth: 5,
            seldepth: 9,
            score,
            nodes: 12_345,
            nps: 100_000,
            elapsed: Duration::from_millis(123),
            hashfull: 7,
            pv: vec![mv("e2e4"), mv("e7e5")],
        }
    }

    #[test]
    fn info_with_centipawns() {
        assert_eq!(
            info_line(&report(31)),
            "info depth 5 seldepth 9 score cp 31 nodes 12345 nps 100000 hashfull 7 time 123 pv e2e4 e7e5"
        );
    }

    #[test]
    fn info_with_mate_scores() {
        assert!(info_line(&report(mate_in(3))).contains("score mate 2 "));
        assert!(info_line(&report(mated_in(2))).contains("score mate -1 "));
    }

    #[test]
    fn bestmove_formats() {
        assert_eq!(bestmove_line(Move::NULL, None), "bestmove 0000");
        assert_eq!(bestmove_line(mv("e2e4"), None), "bestmove e2e4");
        assert_eq!(bestmove_line(mv("e2e4"), Some(mv("e7e5"))), "bestmove e2e4 ponder e7e5");
        assert_eq!(bestmove_line(mv("e7e8q"), Some(Move::NULL)), "bestmove e7e8q");
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.hash_mb, 16);
        assert_eq!(config.move_overhead, Duration::from_millis(10));
        assert_eq!(config.tempo, 10);
    }

    #[test]
    fn bad_hash_size_is_refused_at_startup() {
        let config = EngineConfig {
            hash_mb: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(UciEngine::new(Vec::new(), config), Err(UciError::Engine(_))));
    }
}
