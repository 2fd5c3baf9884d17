use sshtrap::emulator::shell::{ShellSession, Step, HEAD_CAPACITY};

const PROMPT: &str = "[root@localhost] $ ";

fn session() -> ShellSession {
    ShellSession::new("root")
}

#[test]
fn prompt_includes_username() {
    assert_eq!(session().prompt(), PROMPT);
    assert_eq!(ShellSession::new("admin").prompt(), "[admin@localhost] $ ");
}

#[test]
fn exit_line_echoes_and_terminates_without_junk() {
    let mut shell = session();
    let mut out = Vec::new();
    assert_eq!(shell.feed(b"exit\n", &mut out), Step::Exit);
    assert_eq!(out, b"exit\n");
    assert!(shell.is_finished());
}

#[test]
fn exit_is_recognized_after_whitespace_trim() {
    let mut shell = session();
    let mut out = Vec::new();
    assert_eq!(shell.feed(b"\t exit  \r\n", &mut out), Step::Exit);
    assert_eq!(out, b"\t exit  \r\n");
}

#[test]
fn exit_lookalikes_do_not_terminate() {
    for input in [&b"exitt\n"[..], b"EXIT\n", b"quit\n", b"exi\n"] {
        let mut shell = session();
        let mut out = Vec::new();
        assert_eq!(shell.feed(input, &mut out), Step::Continue, "{input:?}");
    }
}

#[test]
fn completed_line_gets_echo_junk_newline_prompt() {
    for _ in 0..20 {
        let mut shell = session();
        let mut out = Vec::new();
        assert_eq!(shell.feed(b"whoami\n", &mut out), Step::Continue);

        assert!(out.starts_with(b"whoami\n"));
        assert!(out.ends_with(PROMPT.as_bytes()));
        // echo + junk + '\n' + prompt; junk is sized on the 7-byte head
        let junk = out.len() - 7 - 1 - PROMPT.len();
        assert!((7..28).contains(&junk), "junk length {junk}");
        assert_eq!(out[7 + junk], b'\n');
    }
}

#[test]
fn partial_line_is_echoed_without_junk() {
    let mut shell = session();
    let mut out = Vec::new();
    assert_eq!(shell.feed(b"who", &mut out), Step::Continue);
    assert_eq!(out, b"who");

    // Completing the line answers the chunk-local part only.
    out.clear();
    assert_eq!(shell.feed(b"ami\n", &mut out), Step::Continue);
    assert!(out.starts_with(b"ami\n"));
    assert!(out.ends_with(PROMPT.as_bytes()));
    let junk = out.len() - 4 - 1 - PROMPT.len();
    assert!((7..28).contains(&junk), "junk length {junk}");
}

#[test]
fn head_captures_first_bytes_across_chunks() {
    let mut shell = session();
    let mut out = Vec::new();
    shell.feed(&[b'a'; 60], &mut out);
    shell.feed(&[b'b'; 60], &mut out);

    assert_eq!(shell.total_bytes(), 120);
    assert_eq!(shell.head().len(), HEAD_CAPACITY);
    assert!(shell.head()[..60].iter().all(|&b| b == b'a'));
    assert!(shell.head()[60..].iter().all(|&b| b == b'b'));
}

#[test]
fn whole_chunk_counts_even_when_exit_cuts_processing() {
    let mut shell = session();
    let mut out = Vec::new();
    assert_eq!(shell.feed(b"exit\nwhoami\n", &mut out), Step::Exit);
    // Nothing after the exit line is echoed, but it was received.
    assert_eq!(out, b"exit\n");
    assert_eq!(shell.total_bytes(), 12);
}

#[test]
fn lines_before_exit_in_one_chunk_are_answered() {
    let mut shell = session();
    let mut out = Vec::new();
    assert_eq!(shell.feed(b"ls\nexit\n", &mut out), Step::Exit);
    assert!(out.starts_with(b"ls\n"));
    assert!(out.ends_with(b"exit\n"));
    // The exit echo follows the prompt that answered "ls".
    let prompt_end = out
        .windows(PROMPT.len())
        .rposition(|w| w == PROMPT.as_bytes())
        .map(|p| p + PROMPT.len())
        .unwrap();
    assert_eq!(&out[prompt_end..], b"exit\n");
}

#[test]
fn finished_session_ignores_further_input() {
    let mut shell = session();
    let mut out = Vec::new();
    shell.feed(b"exit\n", &mut out);

    out.clear();
    assert_eq!(shell.feed(b"whoami\n", &mut out), Step::Exit);
    assert!(out.is_empty());
    assert_eq!(shell.total_bytes(), 5);
}

#[test]
fn summary_reports_total_and_head() {
    let mut shell = session();
    let mut out = Vec::new();
    shell.feed(b"uname -a\n", &mut out);
    shell.feed(b"exit\n", &mut out);

    let summary = shell.finish();
    assert_eq!(summary.total_bytes, 14);
    assert_eq!(summary.head, b"uname -a\nexit\n");
    // Truncated seconds; the whole test runs in well under one.
    assert_eq!(summary.duration_secs, 0);
}
