//! End-to-end tests: raw lines through the parser into typed events.

use std::cell::RefCell;
use std::rc::Rc;

use slirc_client::connection::{RawLine, RawLineEvent};
use slirc_client::protocol::{
    MessageText, NickChange, NickEvent, Numeric, NumericEvent, Origin, Parameters, ParsedEvent,
    PartEvent, PingEvent, QuitEvent, Recipient, Rfc1459Parser,
};
use slirc_client::{ClientError, Event, EventRef, Irc, Phase};

/// Builds a context with the parser loaded and queues one raw line.
fn context_with_line(line: &str) -> (Irc, EventRef) {
    let irc = Irc::new();
    irc.load(Rfc1459Parser::new).unwrap();

    let ev = Event::new::<RawLineEvent>();
    ev.set_tag(RawLine {
        line: line.to_string(),
    });
    irc.queue_event(ev.clone());
    (irc, ev)
}

fn dispatch_line(line: &str) -> EventRef {
    let (irc, ev) = context_with_line(line);
    irc.run_pending().unwrap();
    ev
}

#[test]
fn privmsg_is_parsed_but_not_promoted() {
    let ev = dispatch_line(":nick!user@host PRIVMSG #chan :hi there");
    assert!(ev.was_a::<RawLineEvent>());
    assert!(ev.was_a::<ParsedEvent>());
    assert_eq!(ev.history().len(), 2);
    assert_eq!(ev.get_tag::<Origin>().unwrap().origin, "nick!user@host");
    assert_eq!(
        ev.get_tag::<Parameters>().unwrap().params,
        vec!["nick!user@host", "PRIVMSG", "#chan", "hi there"]
    );
}

#[test]
fn welcome_numeric_promotes_to_numeric_event() {
    let ev = dispatch_line(":srv.example 001 nick :Welcome");
    assert!(ev.was_a::<ParsedEvent>());
    assert!(ev.was_a::<NumericEvent>());
    assert_eq!(ev.get_tag::<Numeric>().unwrap().number, 1);
    assert_eq!(ev.get_tag::<Origin>().unwrap().origin, "srv.example");
}

#[test]
fn nick_change_promotes_to_nick_event() {
    let ev = dispatch_line(":alice!u@h NICK bob");
    assert!(ev.was_a::<NickEvent>());
    assert_eq!(
        ev.get_tag::<NickChange>().unwrap(),
        NickChange {
            old_nick: "alice".to_string(),
            new_nick: "bob".to_string(),
        }
    );
}

#[test]
fn quit_promotes_to_quit_event_with_message() {
    let ev = dispatch_line(":alice!u@h QUIT :bye");
    assert!(ev.was_a::<QuitEvent>());
    assert_eq!(ev.get_tag::<MessageText>().unwrap().raw, "bye");
}

#[test]
fn part_promotes_to_part_event() {
    let ev = dispatch_line(":alice!u@h PART #c :later");
    assert!(ev.was_a::<PartEvent>());
    assert!(!ev.was_a::<QuitEvent>());
    assert_eq!(ev.get_tag::<Recipient>().unwrap().recipient, "#c");
    assert_eq!(ev.get_tag::<MessageText>().unwrap().raw, "later");
}

#[test]
fn ping_promotes_to_ping_event() {
    let ev = dispatch_line("PING :server1");
    assert!(ev.was_a::<PingEvent>());
    assert_eq!(ev.get_tag::<MessageText>().unwrap().raw, "server1");
}

#[test]
fn handlers_observe_promoted_identities_in_order() {
    let (irc, _) = context_with_line(":srv.example 001 nick :Welcome");
    let seen = Rc::new(RefCell::new(Vec::new()));

    let s = seen.clone();
    let _raw = irc.attach::<RawLineEvent>(Phase::Postfilter, move |_, _| {
        s.borrow_mut().push("raw");
        Ok(())
    });
    let s = seen.clone();
    let _parsed = irc.attach::<ParsedEvent>(Phase::Handler, move |_, _| {
        s.borrow_mut().push("parsed");
        Ok(())
    });
    let s = seen.clone();
    let _numeric = irc.attach::<NumericEvent>(Phase::Handler, move |_, _| {
        s.borrow_mut().push("numeric");
        Ok(())
    });

    irc.run_pending().unwrap();
    assert_eq!(*seen.borrow(), vec!["raw", "parsed", "numeric"]);
}

#[test]
fn prefilter_handler_postfilter_ordering_across_attach_order() {
    let irc = Irc::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    struct Probe;
    impl slirc_client::EventKind for Probe {}

    let handles: Vec<_> = [
        (Phase::Handler, "H2"),
        (Phase::Postfilter, "H3"),
        (Phase::Prefilter, "H1"),
        (Phase::Handler, "H2b"),
    ]
    .into_iter()
    .map(|(phase, label)| {
        let s = seen.clone();
        irc.attach::<Probe>(phase, move |_, _| {
            s.borrow_mut().push(label);
            Ok(())
        })
    })
    .collect();

    irc.queue_event(Event::new::<Probe>());
    irc.run_pending().unwrap();
    assert_eq!(*seen.borrow(), vec!["H1", "H2", "H2b", "H3"]);
    drop(handles);
}

#[test]
fn ping_responder_round_trip() {
    // A PING handler that forges the PONG through the queue: the natural
    // use of the engine end to end.
    let irc = Irc::new();
    irc.load(Rfc1459Parser::new).unwrap();

    let pongs = Rc::new(RefCell::new(Vec::new()));
    let p = pongs.clone();
    let _pong = irc.attach::<PingEvent>(Phase::Handler, move |_, ev| {
        let token = ev.get_tag::<MessageText>()?.raw;
        p.borrow_mut().push(format!("PONG :{token}"));
        Ok(())
    });

    for line in ["PING :one", "PING :two"] {
        let ev = Event::new::<RawLineEvent>();
        ev.set_tag(RawLine {
            line: line.to_string(),
        });
        irc.queue_event(ev);
    }

    assert_eq!(irc.run_pending().unwrap(), 2);
    assert_eq!(*pongs.borrow(), vec!["PONG :one", "PONG :two"]);
}

#[test]
fn handler_failure_surrenders_event_to_worker() {
    let (irc, ev) = context_with_line(":srv.example 001 nick :Welcome");
    let _fail = irc.attach::<NumericEvent>(Phase::Handler, |_, _| Err("numeric rejected".into()));

    let err = irc.run_pending().unwrap_err();
    match err {
        ClientError::Handler { event, source } => {
            assert!(event.ends_with("NumericEvent"));
            assert_eq!(source.to_string(), "numeric rejected");
        }
        other => panic!("expected handler error, got {other:?}"),
    }

    // Identities already dispatched stay past; the failing one is still
    // current.
    assert!(ev.was_a::<RawLineEvent>());
    assert!(ev.was_a::<ParsedEvent>());
    assert!(ev.is_a::<NumericEvent>());
}

#[test]
fn queue_order_is_dispatch_order() {
    let irc = Irc::new();

    struct Probe;
    impl slirc_client::EventKind for Probe {}

    #[derive(Clone, Debug, PartialEq)]
    struct Serial(u32);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let _h = irc.attach::<Probe>(Phase::Handler, move |_, ev| {
        s.borrow_mut().push(ev.get_tag::<Serial>()?.0);
        Ok(())
    });

    for n in [1, 2, 3] {
        let ev = Event::new::<Probe>();
        ev.set_tag(Serial(n));
        irc.queue_event(ev);
    }
    // Jumps the queue.
    let ev = Event::new::<Probe>();
    ev.set_tag(Serial(0));
    irc.queue_event_front(ev);

    irc.run_pending().unwrap();
    assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn producer_thread_wakes_worker() {
    let irc = Irc::new();
    let handle = irc.queue_handle();

    struct Probe;
    impl slirc_client::EventKind for Probe {}

    let producer = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        handle.queue_event(Event::new::<Probe>());
    });

    assert!(irc
        .event_available()
        .wait(std::time::Duration::from_secs(10)));
    assert_eq!(irc.run_pending().unwrap(), 1);
    assert!(!irc.event_available().is_open());
    producer.join().unwrap();
}

#[test]
fn swapping_protocol_module_detaches_old_parser() {
    use slirc_client::protocol::Protocol;
    use slirc_client::Module;

    // A stand-in protocol implementation that does nothing.
    struct NullParser;
    impl Module for NullParser {
        type Api = Protocol;
    }

    let irc = Irc::new();
    irc.load(Rfc1459Parser::new).unwrap();
    irc.load(|_| Ok(NullParser)).unwrap();

    // The RFC parser is gone: raw lines no longer promote.
    let ev = Event::new::<RawLineEvent>();
    ev.set_tag(RawLine {
        line: "PING :x".to_string(),
    });
    irc.queue_event(ev.clone());
    irc.run_pending().unwrap();

    assert!(!ev.was_a::<ParsedEvent>());
    assert!(irc.module::<NullParser>().is_ok());
    assert!(irc.module::<Rfc1459Parser>().is_err());
}
