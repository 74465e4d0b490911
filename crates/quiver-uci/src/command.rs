//! UCI command parsing.

use std::time::Duration;

use quiver_board::ChessPosition;
use quiver_engine::{Color, SearchLimits};

use crate::error::UciError;

/// Parameters of a `go` command. A bare `go` searches until stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    pub movestogo: Option<u32>,
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub movetime: Option<Duration>,
    pub infinite: bool,
}

impl GoParams {
    /// The search budget these parameters describe.
    pub fn limits(&self) -> SearchLimits {
        let mut time = [None; 2];
        time[Color::White.index()] = self.wtime;
        time[Color::Black.index()] = self.btime;
        let mut inc = [None; 2];
        inc[Color::White.index()] = self.winc;
        inc[Color::Black.index()] = self.binc;

        SearchLimits {
            depth: self.depth,
            nodes: self.nodes,
            movetime: self.movetime,
            time,
            inc,
            movestogo: self.movestogo,
            infinite: self.infinite,
        }
    }
}

/// Options accepted by `setoption`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOption {
    /// Transposition table size in MB.
    Hash(usize),
    /// Empty the transposition table.
    ClearHash,
    /// Time kept back per move for communication lag.
    MoveOverhead(Duration),
    /// Evaluation bonus for the side to move, in centipawns.
    Tempo(i32),
}

/// A parsed line of protocol input.
#[derive(Debug, Clone)]
pub enum Command {
    Uci,
    IsReady,
    UciNewGame,
    SetOption(UciOption),
    /// The position to search next, game moves already played.
    Position(Box<ChessPosition>),
    Go(GoParams),
    Stop,
    Quit,
    /// Anything else; ignored.
    Unknown(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = tokens.split_first() else {
        return Ok(Command::Unknown(String::new()));
    };

    match head {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "setoption" => parse_setoption(rest).map(Command::SetOption),
        "position" => parse_position(rest),
        "go" => parse_go(rest).map(Command::Go),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        _ => Ok(Command::Unknown(head.to_owned())),
    }
}

/// `position startpos|fen <six fields> [moves <m1> <m2> ...]`
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    let moves_at = tokens.iter().position(|&t| t == "moves").unwrap_or(tokens.len());
    let (setup, moves) = tokens.split_at(moves_at);

    let mut position = match setup.split_first() {
        Some((&"startpos", [])) => ChessPosition::startpos(),
        Some((&"fen", fen)) if !fen.is_empty() => ChessPosition::from_fen(&fen.join(" "))?,
        _ => return Err(UciError::MalformedPosition),
    };

    for uci in moves.iter().skip(1) {
        position.play_uci(uci)?;
    }
    Ok(Command::Position(Box::new(position)))
}

fn parse_go(tokens: &[&str]) -> Result<GoParams, UciError> {
    let mut params = GoParams::default();
    let mut iter = tokens.iter();

    while let Some(&token) = iter.next() {
        match token {
            "wtime" => params.wtime = Some(millis(iter.next(), token)?),
            "btime" => params.btime = Some(millis(iter.next(), token)?),
            "winc" => params.winc = Some(millis(iter.next(), token)?),
            "binc" => params.binc = Some(millis(iter.next(), token)?),
            "movetime" => params.movetime = Some(millis(iter.next(), token)?),
            "movestogo" => params.movestogo = Some(number(iter.next(), token)?),
            "depth" => params.depth = Some(number(iter.next(), token)?),
            "nodes" => params.nodes = Some(number(iter.next(), token)?),
            "infinite" => params.infinite = true,
            // searchmoves, ponder, mate: not supported
            _ => {}
        }
    }
    Ok(params)
}

/// `setoption name <id> [value <x>]`; names are case-insensitive and may
/// contain spaces.
fn parse_setoption(tokens: &[&str]) -> Result<UciOption, UciError> {
    let Some((&"name", rest)) = tokens.split_first() else {
        return Err(UciError::MissingValue { param: "name".into() });
    };
    let value_at = rest.iter().position(|&t| t == "value").unwrap_or(rest.len());
    let name = rest[..value_at].join(" ");
    let value = rest.get(value_at + 1..).map(|v| v.join(" ")).filter(|v| !v.is_empty());

    match name.to_ascii_lowercase().as_str() {
        "hash" => Ok(UciOption::Hash(parse_value(value.as_deref(), &name)?)),
        "clear hash" => Ok(UciOption::ClearHash),
        "move overhead" => Ok(UciOption::MoveOverhead(Duration::from_millis(parse_value(
            value.as_deref(),
            &name,
        )?))),
        "tempo" => Ok(UciOption::Tempo(parse_value(value.as_deref(), &name)?)),
        _ => Err(UciError::UnknownOption { name }),
    }
}

fn parse_value<T: std::str::FromStr>(value: Option<&str>, param: &str) -> Result<T, UciError> {
    let value = value.ok_or_else(|| UciError::MissingValue { param: param.to_owned() })?;
    value.parse().map_err(|_| UciError::InvalidValue {
        param: param.to_owned(),
        value: value.to_owned(),
    })
}

fn number<T: std::str::FromStr>(token: Option<&&str>, param: &str) -> Result<T, UciError> {
    parse_value(token.copied(), param)
}

/// Clock values may arrive negative when a GUI is late; treat them as zero.
fn millis(token: Option<&&str>, param: &str) -> Result<Duration, UciError> {
    let ms: i64 = number(token, param)?;
    Ok(Duration::from_millis(ms.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_engine::{Move, Position};

    fn go(line: &str) -> GoParams {
        match parse_command(line).unwrap() {
            Command::Go(params) => params,
            other => panic!("expected Go, got {other:?}"),
        }
    }

    fn option(line: &str) -> UciOption {
        match parse_command(line).unwrap() {
            Command::SetOption(opt) => opt,
            other => panic!("expected SetOption, got {other:?}"),
        }
    }

    fn position(line: &str) -> ChessPosition {
        match parse_command(line).unwrap() {
            Command::Position(pos) => *pos,
            other => panic!("expected Position, got {other:?}"),
        }
    }

    #[test]
    fn simple_commands() {
        assert!(matches!(parse_command("uci").unwrap(), Command::Uci));
        assert!(matches!(parse_command("isready").unwrap(), Command::IsReady));
        assert!(matches!(parse_command("ucinewgame").unwrap(), Command::UciNewGame));
        assert!(matches!(parse_command("stop").unwrap(), Command::Stop));
        assert!(matches!(parse_command("  quit  ").unwrap(), Command::Quit));
    }

    #[test]
    fn unknown_and_empty_lines_are_ignored() {
        assert!(matches!(parse_command("").unwrap(), Command::Unknown(_)));
        assert!(matches!(parse_command("ponderhit").unwrap(), Command::Unknown(s) if s == "ponderhit"));
    }

    #[test]
    fn position_startpos_with_moves() {
        let pos = position("position startpos moves e2e4 e7e5 g1f3");
        assert_eq!(pos.side_to_move(), Color::Black);
        assert_eq!(pos.game_ply(), 3);
    }

    #[test]
    fn position_fen() {
        let pos = position("position fen 4k3/8/8/8/8/8/8/R3K3 b - - 0 1");
        assert_eq!(pos.side_to_move(), Color::Black);
        let pos = position("position fen 4k3/8/8/8/8/8/8/R3K3 w - - 0 1 moves a1a8");
        assert!(pos.in_check());
    }

    #[test]
    fn position_errors() {
        assert!(matches!(parse_command("position"), Err(UciError::MalformedPosition)));
        assert!(matches!(parse_command("position fen"), Err(UciError::MalformedPosition)));
        assert!(matches!(parse_command("position fen invalid"), Err(UciError::Board(_))));
        assert!(matches!(
            parse_command("position startpos moves e2e5"),
            Err(UciError::Board(_))
        ));
    }

    #[test]
    fn go_depth_nodes_movetime() {
        assert_eq!(go("go depth 6").depth, Some(6));
        assert_eq!(go("go nodes 1000000").nodes, Some(1_000_000));
        assert_eq!(go("go movetime 5000").movetime, Some(Duration::from_millis(5000)));
        assert!(go("go infinite").infinite);
        assert_eq!(go("go"), GoParams::default());
    }

    #[test]
    fn go_clock_becomes_limits() {
        let params = go("go wtime 300000 btime 200000 winc 2000 binc 1000 movestogo 20");
        let limits = params.limits();
        assert_eq!(limits.time[Color::White.index()], Some(Duration::from_millis(300_000)));
        assert_eq!(limits.time[Color::Black.index()], Some(Duration::from_millis(200_000)));
        assert_eq!(limits.inc[Color::Black.index()], Some(Duration::from_millis(1000)));
        assert_eq!(limits.movestogo, Some(20));
        assert!(limits.time_budget(Color::White, Duration::from_millis(10)).is_some());
    }

    #[test]
    fn negative_clock_is_zero() {
        assert_eq!(go("go wtime -50").wtime, Some(Duration::ZERO));
    }

    #[test]
    fn go_value_errors() {
        assert!(matches!(parse_command("go wtime"), Err(UciError::MissingValue { .. })));
        assert!(matches!(parse_command("go depth abc"), Err(UciError::InvalidValue { .. })));
    }

    #[test]
    fn setoption_variants() {
        assert_eq!(option("setoption name Hash value 64"), UciOption::Hash(64));
        assert_eq!(option("setoption name Clear Hash"), UciOption::ClearHash);
        assert_eq!(
            option("setoption name Move Overhead value 30"),
            UciOption::MoveOverhead(Duration::from_millis(30))
        );
        assert_eq!(option("setoption name tempo value 15"), UciOption::Tempo(15));
    }

    #[test]
    fn setoption_errors() {
        assert!(matches!(
            parse_command("setoption name Threads value 4"),
            Err(UciError::UnknownOption { name }) if name == "Threads"
        ));
        assert!(matches!(parse_command("setoption name Hash"), Err(UciError::MissingValue { .. })));
        assert!(matches!(
            parse_command("setoption name Hash value big"),
            Err(UciError::InvalidValue { .. })
        ));
        assert!(parse_command("setoption").is_err());
    }

    #[test]
    fn castling_in_move_list() {
        let pos = position("position startpos moves e2e4 e7e5 g1f3 b8c6 f1c4 g8f6 e1g1");
        assert!(!pos.is_legal(Move::from_uci("e1g1").unwrap()));
        assert_eq!(pos.side_to_move(), Color::Black);
    }
}
