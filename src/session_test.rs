use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::*;
use crate::state::NoteQuery;

fn test_board() -> Arc<Board> {
    let colors: BTreeSet<String> = ["red", "white"].iter().map(ToString::to_string).collect();
    Arc::new(Board::new(200, 100, 20, 10, colors))
}

/// Feed a whole command script through a session over in-memory pipes and
/// return every output line, handshake included.
async fn run_script(board: Arc<Board>, script: &str) -> Vec<String> {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let (mut client_read, mut client_write) = tokio::io::split(client);

    let handle = tokio::spawn(async move {
        let mut session = Session::new(BufReader::new(server_read), server_write, board);
        session.run().await
    });

    client_write.write_all(script.as_bytes()).await.expect("write script");
    client_write.shutdown().await.expect("shutdown write half");

    let mut output = String::new();
    client_read.read_to_string(&mut output).await.expect("read output");
    handle.await.expect("session task panicked").expect("session I/O failed");

    output.lines().map(ToOwned::to_owned).collect()
}

const HANDSHAKE: [&str; 4] = ["BOARD 200 100", "NOTE 20 10", "COLORS red white", "OK"];

/// Output lines after the four handshake lines.
fn responses(lines: &[String]) -> &[String] {
    assert_eq!(&lines[..4], &HANDSHAKE, "handshake block mismatch");
    &lines[4..]
}

// =============================================================================
// HANDSHAKE
// =============================================================================

#[tokio::test]
async fn handshake_is_sent_before_any_command() {
    let lines = run_script(test_board(), "").await;
    assert_eq!(lines, HANDSHAKE);
}

#[tokio::test]
async fn handshake_colors_are_sorted() {
    let colors: BTreeSet<String> = ["white", "green", "red"].iter().map(ToString::to_string).collect();
    let board = Arc::new(Board::new(300, 200, 30, 20, colors));
    let lines = run_script(board, "").await;
    assert_eq!(lines, ["BOARD 300 200", "NOTE 30 20", "COLORS green red white", "OK"]);
}

// =============================================================================
// COMMAND LOOP
// =============================================================================

#[tokio::test]
async fn blank_lines_are_ignored_without_a_response() {
    let lines = run_script(test_board(), "\n   \nSHAKE\n\n").await;
    assert_eq!(responses(&lines), ["OK"]);
}

#[tokio::test]
async fn malformed_input_keeps_the_session_open() {
    let board = test_board();
    let lines = run_script(
        Arc::clone(&board),
        "FROBNICATE\nPOST nope\nPOST 10 10 red still works\n",
    )
    .await;

    let responses = responses(&lines);
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0], "ERROR INVALID_FORMAT Unrecognized command: FROBNICATE");
    assert!(responses[1].starts_with("ERROR INVALID_FORMAT"));
    assert_eq!(responses[2], "OK");
    assert_eq!(board.notes(&NoteQuery::default()).await.len(), 1);
}

#[tokio::test]
async fn disconnect_replies_bye_and_ends_the_session() {
    let lines = run_script(test_board(), "DISCONNECT\nSHAKE\n").await;
    // The SHAKE after DISCONNECT is never processed.
    assert_eq!(responses(&lines), ["OK bye"]);
}

#[tokio::test]
async fn eof_without_disconnect_ends_the_session_cleanly() {
    let lines = run_script(test_board(), "SHAKE\n").await;
    assert_eq!(responses(&lines), ["OK"]);
}

// =============================================================================
// LISTINGS
// =============================================================================

#[tokio::test]
async fn get_lists_matching_notes_then_a_count() {
    let script = "POST 0 0 red alpha\nPOST 40 0 white beta\nPOST 80 0 red gamma\nGET color=red\n";
    let lines = run_script(test_board(), script).await;
    assert_eq!(
        responses(&lines),
        ["OK", "OK", "OK", "NOTE 0 0 red alpha", "NOTE 80 0 red gamma", "OK 2"]
    );
}

#[tokio::test]
async fn get_pins_lists_every_pin_then_a_count() {
    let script = "POST 10 10 red hi\nPIN 15 12\nPIN 15 12\nGET PINS\n";
    let lines = run_script(test_board(), script).await;
    assert_eq!(responses(&lines), ["OK", "OK", "OK", "PIN 15 12", "PIN 15 12", "OK 2"]);
}

#[tokio::test]
async fn get_with_no_matches_returns_a_zero_count() {
    let lines = run_script(test_board(), "GET color=red\nGET PINS\n").await;
    assert_eq!(responses(&lines), ["OK 0", "OK 0"]);
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[tokio::test]
async fn board_errors_carry_their_wire_codes() {
    let script = "POST 500 500 red hi\nPOST 10 10 blue hi\nPIN 50 50\nUNPIN 1 1\n";
    let lines = run_script(test_board(), script).await;

    let responses = responses(&lines);
    assert_eq!(responses.len(), 4);
    assert!(responses[0].starts_with("ERROR OUT_OF_BOUNDS "));
    assert!(responses[1].starts_with("ERROR COLOUR_NOT_SUPPORTED "));
    assert!(responses[2].starts_with("ERROR NO_NOTE_AT_COORDINATE "));
    assert!(responses[3].starts_with("ERROR PIN_NOT_FOUND "));
}

// =============================================================================
// SCENARIO
// =============================================================================

#[tokio::test]
async fn pin_shake_unpin_shake_scenario() {
    // Board 200x100, notes 20x10, colors {red, white}.
    let script = "POST 10 10 red Hello\n\
                  POST 10 10 white Bye\n\
                  PIN 15 12\n\
                  SHAKE\n\
                  GET color=red\n\
                  UNPIN 15 12\n\
                  SHAKE\n\
                  GET color=red\n";
    let lines = run_script(test_board(), script).await;

    let responses = responses(&lines);
    assert_eq!(responses[0], "OK");
    assert!(responses[1].starts_with("ERROR COMPLETE_OVERLAP "));
    assert_eq!(responses[2], "OK");
    assert_eq!(responses[3], "OK");
    // Pinned note survives the first shake.
    assert_eq!(&responses[4..6], ["NOTE 10 10 red Hello", "OK 1"]);
    assert_eq!(responses[6], "OK");
    assert_eq!(responses[7], "OK");
    // Unpinned note is gone after the second shake.
    assert_eq!(responses[8], "OK 0");
}

// =============================================================================
// SHARED STATE
// =============================================================================

#[tokio::test]
async fn board_state_persists_across_sessions() {
    let board = test_board();

    let lines = run_script(Arc::clone(&board), "POST 10 10 red from the first session\n").await;
    assert_eq!(responses(&lines), ["OK"]);

    let lines = run_script(board, "GET refersTo=first session\n").await;
    assert_eq!(
        responses(&lines),
        ["NOTE 10 10 red from the first session", "OK 1"]
    );
}
