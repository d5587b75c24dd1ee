//! Mutations on different organizations must not queue behind each other.

use notegraph_core::db::open_db_in_memory;
use notegraph_core::{
    AccessGate, AttachmentError, AttachmentResult, AttachmentStore, EntryAction, EntryService,
    NewEntry,
};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct AllowAll;

impl AccessGate for AllowAll {
    fn authorize(&self, _user_id: &str, _org_id: &str, _action: EntryAction) -> bool {
        true
    }
}

/// Store whose `delete` parks until the test releases it, so one
/// organization's mutation can be held mid-section on purpose.
struct GatedFiles {
    entered_tx: Mutex<Sender<()>>,
    release_rx: Mutex<Receiver<()>>,
}

impl AttachmentStore for GatedFiles {
    fn upload(&self, _bytes: &[u8], _file_name: &str) -> AttachmentResult<String> {
        Ok("blob-0".to_string())
    }

    fn download(&self, attachment_id: &str) -> AttachmentResult<Vec<u8>> {
        Err(AttachmentError::NotFound(attachment_id.to_string()))
    }

    fn delete(&self, _attachment_id: &str) -> AttachmentResult<()> {
        let _ = self.entered_tx.lock().unwrap().send(());
        let _ = self.release_rx.lock().unwrap().recv();
        Ok(())
    }
}

fn new_entry(org: &str, group: &str, name: &str) -> NewEntry {
    NewEntry {
        org_id: org.to_string(),
        group_id: group.to_string(),
        name: name.to_string(),
        content: String::new(),
        user_id: "user-1".to_string(),
        attachment_id: None,
    }
}

#[test]
fn a_stalled_organization_does_not_block_the_others() {
    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel();
    let files = Arc::new(GatedFiles {
        entered_tx: Mutex::new(entered_tx),
        release_rx: Mutex::new(release_rx),
    });

    let conn = open_db_in_memory().unwrap();
    let engine = EntryService::new(conn, AllowAll, files);

    let mut request = new_entry("org-0", "grp-1", "Budget");
    request.attachment_id = Some("blob-1".to_string());
    let held = engine.create_entry(request).unwrap();

    std::thread::scope(|scope| {
        // Holds org-0's serialization section, parked inside the blob store.
        scope.spawn(|| {
            engine.delete_entry(held.uuid, "grp-1", "user-1").unwrap();
        });
        entered_rx.recv().unwrap();

        // Queues a second org-0 mutation behind the held section.
        scope.spawn(|| {
            engine
                .create_entry(new_entry("org-0", "grp-1", "Roadmap"))
                .unwrap();
        });
        std::thread::sleep(Duration::from_millis(100));

        // Every other organization must still mutate while org-0 is both
        // held and queued on.
        for n in 1..=64 {
            engine
                .create_entry(new_entry(&format!("org-{n}"), "grp-1", "Budget"))
                .unwrap();
        }

        release_tx.send(()).unwrap();
    });

    assert_eq!(engine.list_entries("org-0", "grp-1").unwrap().len(), 1);
    for n in 1..=64 {
        assert_eq!(
            engine
                .list_entries(&format!("org-{n}"), "grp-1")
                .unwrap()
                .len(),
            1
        );
    }
}
