use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tether::proto::uuid::Uuid;
use tether::proto::{CommandOrigin, CommandOutput, Packet, PlayerList, PlayerListEntry, TextPacket};
use tether::store::MemoryEngine;
use tether::{
    BackendInteract, BackendMenuEntry, ConfigProvider, ContextProvider, Framework, FrameworkConfig, FrameworkError, GameChat,
    GameMenuEntry, InboundEvent, MainFrame, MenuEntry, PacketSink, SecurityEventIo, StorageAndLogProvider, StorageExt,
    TransportError, FIRST_SEEN_TOPIC,
};

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<Packet>>,
}

impl RecordingSink {
    fn requests(&self) -> Vec<tether::proto::CommandRequest> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| match p {
                Packet::CommandRequest(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PacketSink for RecordingSink {
    fn write_packet(&self, packet: Packet) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(packet);
        Ok(())
    }
}

fn memory_framework() -> (Arc<Framework>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let frame = Framework::builder()
        .sink(Arc::clone(&sink) as Arc<dyn PacketSink>)
        .engine(MemoryEngine)
        .build()
        .unwrap();
    (frame, sink)
}

fn file_framework(root: &std::path::Path) -> Arc<Framework> {
    let mut config = FrameworkConfig::default();
    config.storage.root = root.to_path_buf();
    Framework::builder()
        .config(config)
        .sink(Arc::new(RecordingSink::default()))
        .build()
        .unwrap()
}

fn chat(name: &str, line: &str) -> InboundEvent {
    Packet::Text(TextPacket::chat(format!("<{name}>"), line)).into()
}

fn join(name: &str, uuid: Uuid) -> InboundEvent {
    Packet::PlayerList(PlayerList::add(vec![PlayerListEntry::new(uuid, name)])).into()
}

fn leave(uuid: Uuid) -> InboundEvent {
    Packet::PlayerList(PlayerList::remove([uuid])).into()
}

fn output_for(uuid: Uuid) -> CommandOutput {
    CommandOutput {
        origin: CommandOrigin::player(uuid),
        output_type: 3,
        success_count: 1,
        messages: Vec::new(),
        data_set: String::new(),
    }
}

#[test]
fn test_overlapping_final_entries_first_registered_wins() {
    let (frame, _) = memory_framework();
    let hits = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second"] {
        let hits = Arc::clone(&hits);
        frame
            .get_game_listener()
            .set_game_menu_entry(GameMenuEntry::new(MenuEntry::new(["help"]), move |_: &GameChat| {
                hits.lock().unwrap().push(tag);
                true
            }))
            .unwrap();
    }

    frame.dispatch(chat("Steve", "help"));
    assert_eq!(*hits.lock().unwrap(), vec!["first"]);
}

#[test]
fn test_stopping_interceptor_hides_chat_from_later_ones() {
    let (frame, _) = memory_framework();
    let later = Arc::new(AtomicUsize::new(0));

    frame
        .get_game_listener()
        .set_game_chat_interceptor(Box::new(|c: &GameChat| c.line() == "secret"))
        .unwrap();
    let counter = Arc::clone(&later);
    frame
        .get_game_listener()
        .set_game_chat_interceptor(Box::new(move |_: &GameChat| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        }))
        .unwrap();

    frame.dispatch(chat("Steve", "secret"));
    frame.dispatch(chat("Steve", "public words"));
    assert_eq!(later.load(Ordering::SeqCst), 1);
}

#[test]
fn test_second_param_binding_replaces_first() {
    let (frame, _) = memory_framework();
    let uuid = Uuid::new_v4();
    frame.dispatch(join("Steve", uuid));

    let calls = Arc::new(Mutex::new(Vec::new()));
    for tag in ["old", "new"] {
        let calls = Arc::clone(&calls);
        frame
            .get_game_control()
            .set_on_param_msg(
                "Steve",
                Box::new(move |c: &GameChat| {
                    calls.lock().unwrap().push((tag, c.line()));
                    true
                }),
            )
            .unwrap();
    }

    let intercepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&intercepted);
    frame
        .get_game_listener()
        .set_game_chat_interceptor(Box::new(move |_: &GameChat| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        }))
        .unwrap();

    frame.dispatch(chat("Steve", "42"));
    frame.dispatch(chat("Steve", "again"));

    assert_eq!(*calls.lock().unwrap(), vec![("new", "42".to_string())]);
    // The claim was one-shot; the second message reached the interceptors.
    assert_eq!(intercepted.load(Ordering::SeqCst), 1);
}

#[test]
fn test_param_binding_requires_online_player() {
    let (frame, _) = memory_framework();
    let result = frame
        .get_game_control()
        .set_on_param_msg("Ghost", Box::new(|_: &GameChat| true));
    assert!(matches!(result, Err(FrameworkError::PlayerNotFound(_))));

    let result = frame.get_game_control().set_on_param_msg("", Box::new(|_: &GameChat| true));
    assert!(matches!(result, Err(FrameworkError::InvalidBinding(_))));
}

#[test]
fn test_red_alert_reaches_every_handler_in_order() {
    let (frame, _) = memory_framework();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..4 {
        let order = Arc::clone(&order);
        frame
            .reg_on_alert_handler(Box::new(move |info: &str| -> anyhow::Result<()> {
                order.lock().unwrap().push((i, info.to_string()));
                if i == 1 {
                    anyhow::bail!("handler {i} refused");
                }
                if i == 2 {
                    panic!("handler {i} crashed");
                }
                Ok(())
            }))
            .unwrap();
    }

    frame.red_alert("x");
    let seen: Vec<usize> = order.lock().unwrap().iter().map(|(i, _)| *i).collect();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[test]
fn test_command_response_correlates_by_uuid() {
    let (frame, sink) = memory_framework();
    let received = Arc::new(Mutex::new(Vec::new()));

    let store = Arc::clone(&received);
    frame
        .get_game_control()
        .send_cmd_and_invoke_on_response(
            "list",
            Box::new(move |output: Option<CommandOutput>| {
                store.lock().unwrap().push(output.map(|o| o.success_count));
            }),
        )
        .unwrap();

    let requests = sink.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command_line, "list");

    frame.dispatch(Packet::CommandOutput(output_for(Uuid::new_v4())).into());
    assert!(received.lock().unwrap().is_empty());

    frame.dispatch(Packet::CommandOutput(output_for(requests[0].correlation_id())).into());
    assert_eq!(*received.lock().unwrap(), vec![Some(1)]);
}

#[test]
fn test_connection_loss_resolves_pending_with_none_once() {
    let (frame, _) = memory_framework();
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    for cmd in ["a", "b"] {
        let outcomes = Arc::clone(&outcomes);
        frame
            .get_game_control()
            .send_cmd_and_invoke_on_response(
                cmd,
                Box::new(move |output: Option<CommandOutput>| {
                    outcomes.lock().unwrap().push(output.is_none());
                }),
            )
            .unwrap();
    }

    frame.dispatch(InboundEvent::ConnectionLost {
        reason: "reset".to_string(),
    });
    frame.dispatch(InboundEvent::ConnectionLost {
        reason: "again".to_string(),
    });
    assert_eq!(*outcomes.lock().unwrap(), vec![true, true]);
}

#[test]
fn test_connection_loss_logs_everyone_out() {
    let (frame, _) = memory_framework();
    let left = Arc::new(Mutex::new(Vec::new()));
    let names = Arc::clone(&left);
    frame
        .get_game_listener()
        .append_logout_info_callback(Box::new(move |entry: &PlayerListEntry| {
            names.lock().unwrap().push(entry.username.clone());
        }))
        .unwrap();

    frame.dispatch(join("Alex", Uuid::new_v4()));
    frame.dispatch(join("Steve", Uuid::new_v4()));
    frame.dispatch(InboundEvent::ConnectionLost {
        reason: "timeout".to_string(),
    });

    let mut left = left.lock().unwrap().clone();
    left.sort();
    assert_eq!(left, vec!["Alex", "Steve"]);
    assert_eq!(frame.get_uq_holder().online_count(), 0);
}

#[test]
fn test_first_seen_fires_once_per_name() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(AtomicUsize::new(0));

    let frame = file_framework(dir.path());
    let counter = Arc::clone(&seen);
    frame
        .get_game_listener()
        .append_on_first_see_player_callback(Box::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    let uuid = Uuid::new_v4();
    frame.dispatch(join("Steve", uuid));
    frame.dispatch(leave(uuid));
    frame.dispatch(join("Steve", uuid));
    frame.dispatch(InboundEvent::ConnectionLost {
        reason: "reconnect".to_string(),
    });
    frame.dispatch(join("Steve", Uuid::new_v4()));
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    let stamp = frame.get_nosql_db(FIRST_SEEN_TOPIC).unwrap().get("Steve");
    assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    frame.shutdown("restart");

    // A fresh process over the same storage remembers the name.
    let frame = file_framework(dir.path());
    let counter = Arc::clone(&seen);
    frame
        .get_game_listener()
        .append_on_first_see_player_callback(Box::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
    frame.dispatch(join("Steve", Uuid::new_v4()));
    frame.dispatch(join("Alex", Uuid::new_v4()));
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_json_writes_leave_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let frame = file_framework(dir.path());

    frame.write_json("plugin/scores", &serde_json::json!({"steve": 10})).unwrap();
    frame.write_json("plugin/scores", &serde_json::json!({"steve": 11})).unwrap();

    let relative = frame.get_relative_file_name("plugin/scores").unwrap();
    let data_dir = dir.path().join(relative.parent().unwrap());
    let files: Vec<_> = std::fs::read_dir(&data_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(files.len(), 1);

    let scores: Option<serde_json::Value> = frame.read_json("plugin/scores").unwrap();
    assert_eq!(scores, Some(serde_json::json!({"steve": 11})));
}

#[test]
fn test_commit_get_delete_scenario() {
    let (frame, _) = memory_framework();
    let db = frame.get_nosql_db("pluginA").unwrap();

    db.commit("score", "10");
    assert_eq!(db.get("score"), "10");
    db.delete("score");
    assert_eq!(db.get("score"), "");

    // The same topic is shared by whoever opens it.
    frame.get_nosql_db("pluginA").unwrap().commit("shared", "yes");
    assert_eq!(db.get("shared"), "yes");
}

#[test]
fn test_backend_overlapping_entries_first_wins() {
    let (frame, _) = memory_framework();
    let hits = Arc::new(Mutex::new(Vec::new()));

    for tag in ["E1", "E2"] {
        let hits = Arc::clone(&hits);
        frame
            .set_backend_menu_entry(BackendMenuEntry::new(MenuEntry::new(["tp"]), move |_: &[String]| {
                hits.lock().unwrap().push(tag);
                true
            }))
            .unwrap();
    }

    frame.dispatch(InboundEvent::BackendLine("tp".to_string()));
    assert_eq!(*hits.lock().unwrap(), vec!["E1"]);
    assert_eq!(frame.backend_menu_usage().len(), 2);
}

#[test]
fn test_fatal_error_terminates_capabilities() {
    let (frame, sink) = memory_framework();
    let alerts = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::clone(&alerts);
    frame
        .reg_on_alert_handler(Box::new(move |info: &str| -> anyhow::Result<()> {
            store.lock().unwrap().push(info.to_string());
            Ok(())
        }))
        .unwrap();

    frame.fatal_error("disk on fire");
    assert!(frame.is_terminated());
    assert_eq!(alerts.lock().unwrap().len(), 1);
    assert!(alerts.lock().unwrap()[0].starts_with("shutdown: "));

    let result = frame
        .get_game_listener()
        .set_game_chat_interceptor(Box::new(|_: &GameChat| false));
    assert!(matches!(result, Err(FrameworkError::Terminated)));
    assert!(matches!(frame.get_game_control().send_cmd("say hi"), Err(FrameworkError::Terminated)));
    assert!(matches!(
        frame.update_config("anything", "key", serde_json::json!(1)),
        Err(FrameworkError::Terminated)
    ));

    let got_none = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&got_none);
    let result = frame.get_game_control().send_cmd_and_invoke_on_response(
        "list",
        Box::new(move |output: Option<CommandOutput>| {
            assert!(output.is_none());
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert!(result.is_err());
    assert_eq!(got_none.load(Ordering::SeqCst), 1);
    assert!(sink.requests().is_empty());
}

#[test]
fn test_fatal_error_silences_kits_and_tables() {
    let (frame, sink) = memory_framework();
    frame.dispatch(join("Steve", Uuid::new_v4()));
    let kit = frame.get_game_control().get_player_kit("Steve").unwrap();
    let db = frame.get_nosql_db("pluginA").unwrap();
    db.commit("k", "before");
    let sent_before = sink.requests().len();

    frame.fatal_error("boom");

    assert!(matches!(kit.say("still there?"), Err(FrameworkError::Terminated)));
    assert!(matches!(
        kit.commit_persist_storage("coins", "1"),
        Err(FrameworkError::Terminated)
    ));
    assert_eq!(sink.requests().len(), sent_before);
    assert!(frame.get_game_control().get_player_kit("Steve").is_none());
    assert_eq!(frame.get_uq_holder().online_count(), 0);

    db.commit("k", "after");
    assert_eq!(db.get("k"), "before");
    assert_eq!(frame.get_nosql_db("pluginA").unwrap().get("k"), "before");
}

#[test]
fn test_concurrent_registrations_are_all_kept() {
    const PLUGINS: usize = 8;
    let (frame, _) = memory_framework();
    let menu_hits = Arc::new(AtomicUsize::new(0));
    let alerts = Arc::new(AtomicUsize::new(0));
    let first_seen = Arc::new(AtomicUsize::new(0));

    std::thread::scope(|scope| {
        for i in 0..PLUGINS {
            let frame = &frame;
            let menu_hits = Arc::clone(&menu_hits);
            let alerts = Arc::clone(&alerts);
            let first_seen = Arc::clone(&first_seen);
            scope.spawn(move || {
                frame
                    .get_game_listener()
                    .set_game_menu_entry(GameMenuEntry::new(
                        MenuEntry::new([format!("cmd{i}")]).usage(format!("plugin {i}")),
                        move |_: &GameChat| {
                            menu_hits.fetch_add(1, Ordering::SeqCst);
                            true
                        },
                    ))
                    .unwrap();
                frame
                    .set_backend_menu_entry(BackendMenuEntry::new(
                        MenuEntry::new([format!("op{i}")]),
                        |_: &[String]| true,
                    ))
                    .unwrap();
                frame
                    .reg_on_alert_handler(Box::new(move |_: &str| -> anyhow::Result<()> {
                        alerts.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }))
                    .unwrap();
                frame
                    .get_game_listener()
                    .append_on_first_see_player_callback(Box::new(move |_: &str| {
                        first_seen.fetch_add(1, Ordering::SeqCst);
                    }))
                    .unwrap();
            });
        }
    });

    assert_eq!(frame.get_game_listener().game_menu_usage().len(), PLUGINS);
    assert_eq!(frame.backend_menu_usage().len(), PLUGINS);

    for i in 0..PLUGINS {
        frame.dispatch(chat("Steve", &format!("cmd{i}")));
    }
    frame.red_alert("x");
    frame.dispatch(join("Steve", Uuid::new_v4()));

    assert_eq!(menu_hits.load(Ordering::SeqCst), PLUGINS);
    assert_eq!(alerts.load(Ordering::SeqCst), PLUGINS);
    assert_eq!(first_seen.load(Ordering::SeqCst), PLUGINS);
}

#[tokio::test]
async fn test_serve_until_transport_hangs_up() {
    let (frame, _) = memory_framework();
    let joined = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&joined);
    frame
        .get_game_listener()
        .append_login_info_callback(Box::new(move |_: &PlayerListEntry| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let task = tokio::spawn(Arc::clone(&frame).serve(rx));

    tx.send(join("Steve", Uuid::new_v4())).await.unwrap();
    let pending = frame.send_cmd_and_wait("list");
    drop(tx);

    task.await.unwrap();
    assert_eq!(joined.load(Ordering::SeqCst), 1);
    assert_eq!(pending.await.unwrap(), None);
}

#[tokio::test]
async fn test_serve_stops_on_shutdown() {
    let (frame, _) = memory_framework();
    let (_tx, rx) = tokio::sync::mpsc::channel::<InboundEvent>(8);
    let task = tokio::spawn(Arc::clone(&frame).serve(rx));

    frame.shutdown("operator request");
    tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}
