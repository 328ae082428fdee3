//! Integration tests for the codebook-vault crate.
//!
//! These tests drive the full codebook lifecycle through the public API:
//! creation, entry management, paging, and cascading deletion, against both
//! in-memory and on-disk SQLite databases.

use codebook_vault::{PasswordVault, VaultError, schema};
use rusqlite::Connection;

/// Open an in-memory database with the expected tables.
fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::apply(&conn).unwrap();
    conn
}

fn only_codebook_id(vault: &PasswordVault<'_>, owner: &str) -> i64 {
    let books = vault.get_user_codebooks(owner).unwrap();
    assert_eq!(books.len(), 1);
    books[0].id
}

// ═══════════════════════════════════════════════════════════════════════
//  Codebook lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn codebook_create_list_delete() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    // Create.
    assert!(vault.create_codebook("alice", "Banking").unwrap());

    // List.
    let books = vault.get_user_codebooks("alice").unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].owner, "alice");
    assert_eq!(books[0].name, "Banking");
    assert!(!books[0].created_time.is_empty());

    // Delete.
    assert!(vault.delete_codebook(books[0].id).unwrap());
    assert!(vault.get_user_codebooks("alice").unwrap().is_empty());

    // Deleting again reports not-found.
    assert!(!vault.delete_codebook(books[0].id).unwrap());
}

#[test]
fn codebook_duplicate_is_noop() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    assert!(vault.create_codebook("alice", "Banking").unwrap());
    let id = only_codebook_id(&vault, "alice");

    assert!(vault.create_codebook("alice", "Banking").unwrap());
    assert_eq!(only_codebook_id(&vault, "alice"), id);
}

#[test]
fn codebook_name_validation() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    assert!(matches!(
        vault.create_codebook("user", ""),
        Err(VaultError::InvalidArgument(_))
    ));
    assert!(matches!(
        vault.create_codebook("user", &"x".repeat(101)),
        Err(VaultError::InvalidArgument(_))
    ));
    assert!(matches!(
        vault.create_codebook("user", "drop;table"),
        Err(VaultError::InvalidArgument(_))
    ));
    assert!(vault.create_codebook("user", "A-B_C 1").unwrap());
}

// ═══════════════════════════════════════════════════════════════════════
//  Entries
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn entry_add_update_read_back() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    vault.create_codebook("alice", "Personal").unwrap();
    let book = only_codebook_id(&vault, "alice");

    assert!(
        vault
            .add_entry(book, "github.com", "pk-v1", "ct-v1", "2fa enabled")
            .unwrap()
    );

    let entries = vault.get_entries(book, "", 0, 10).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.codebook_id, book);
    assert_eq!(entry.address, "github.com");
    assert_eq!(entry.notes, "2fa enabled");

    assert!(
        vault
            .update_entry(entry.id, "github.com", "pk-v2", "ct-v2", "rotated")
            .unwrap()
    );

    let updated = vault.get_entries(book, "github", 0, 10).unwrap().remove(0);
    assert_eq!(updated.public_key, "pk-v2");
    assert_eq!(updated.encrypted_password, "ct-v2");
    assert_eq!(updated.notes, "rotated");
    assert_eq!(updated.created_time, entry.created_time);
}

#[test]
fn entry_for_unknown_codebook_is_rejected() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    assert!(!vault.add_entry(1, "example.com", "pk", "ct", "").unwrap());
    assert!(vault.get_entries(1, "", 0, 10).unwrap().is_empty());
}

#[test]
fn entry_update_boundaries() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    vault.create_codebook("alice", "Personal").unwrap();
    let book = only_codebook_id(&vault, "alice");
    vault.add_entry(book, "example.com", "pk", "ct", "").unwrap();
    let entry_id = vault.get_entries(book, "", 0, 1).unwrap()[0].id;

    // Unknown entry.
    assert!(!vault.update_entry(entry_id + 100, "example.com", "pk", "ct", "").unwrap());

    // 254-character address.
    let err = vault
        .update_entry(entry_id, &"a".repeat(254), "pk", "ct", "")
        .unwrap_err();
    assert!(err.is_invalid_argument());

    // Maximum lengths are accepted.
    assert!(
        vault
            .update_entry(
                entry_id,
                &"a".repeat(253),
                &"k".repeat(4096),
                &"s".repeat(512),
                &"n".repeat(10_000),
            )
            .unwrap()
    );
}

#[test]
fn entry_paging_and_filtering() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    vault.create_codebook("alice", "Personal").unwrap();
    let book = only_codebook_id(&vault, "alice");

    let addresses = [
        "one.example.com",
        "two.example.org",
        "three.example.com",
        "four.example.net",
        "five.example.com",
    ];
    for address in addresses {
        assert!(vault.add_entry(book, address, "pk", "ct", "").unwrap());
    }

    // Newest first, page 1 of size 2 holds the 3rd and 4th newest.
    let page: Vec<_> = vault
        .get_entries(book, "", 1, 2)
        .unwrap()
        .into_iter()
        .map(|e| e.address)
        .collect();
    assert_eq!(page, ["three.example.com", "two.example.org"]);

    let matching: Vec<_> = vault
        .get_entries(book, "example.com", 0, 10)
        .unwrap()
        .into_iter()
        .map(|e| e.address)
        .collect();
    assert_eq!(
        matching,
        ["five.example.com", "three.example.com", "one.example.com"]
    );

    assert!(vault.get_entries(book, "example.com", 5, 10).unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Cascading delete
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn delete_leaves_other_codebooks_alone() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    vault.create_codebook("alice", "Personal").unwrap();
    vault.create_codebook("bob", "Personal").unwrap();
    let alice_book = only_codebook_id(&vault, "alice");
    let bob_book = only_codebook_id(&vault, "bob");

    vault.add_entry(alice_book, "a.example.com", "pk", "ct", "").unwrap();
    vault.add_entry(bob_book, "b.example.com", "pk", "ct", "").unwrap();

    assert!(vault.delete_codebook(alice_book).unwrap());

    let orphans: i64 = conn
        .query_row(
            "SELECT count(*) FROM PasswordEntry WHERE codebook_id = ?1",
            [alice_book],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
    assert_eq!(vault.get_entries(bob_book, "", 0, 10).unwrap().len(), 1);
    assert_eq!(vault.get_user_codebooks("bob").unwrap().len(), 1);
}

#[test]
fn delete_failure_keeps_codebook() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    vault.create_codebook("alice", "Personal").unwrap();
    let book = only_codebook_id(&vault, "alice");
    vault.add_entry(book, "example.com", "pk", "ct", "").unwrap();

    conn.execute_batch(
        "CREATE TEMP TRIGGER fail_entry_delete BEFORE DELETE ON PasswordEntry
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .unwrap();

    let result = vault.delete_codebook(book);
    assert!(matches!(result, Err(VaultError::Storage { .. })));

    assert_eq!(only_codebook_id(&vault, "alice"), book);
    assert_eq!(vault.get_entries(book, "", 0, 10).unwrap().len(), 1);

    // Once the failure is removed the same delete goes through.
    conn.execute_batch("DROP TRIGGER fail_entry_delete;").unwrap();
    assert!(vault.delete_codebook(book).unwrap());
    assert!(vault.get_user_codebooks("alice").unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  On-disk database
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");

    {
        let conn = Connection::open(&path).unwrap();
        schema::apply(&conn).unwrap();
        let vault = PasswordVault::new(&conn).unwrap();
        vault.create_codebook("alice", "Personal").unwrap();
        let book = only_codebook_id(&vault, "alice");
        vault.add_entry(book, "example.com", "pk", "ct", "note").unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    let vault = PasswordVault::new(&conn).unwrap();
    let book = only_codebook_id(&vault, "alice");
    let entries = vault.get_entries(book, "", 0, 10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].notes, "note");
}

#[test]
fn records_serialize_to_json() {
    let conn = test_conn();
    let vault = PasswordVault::new(&conn).unwrap();

    vault.create_codebook("alice", "Personal").unwrap();
    let book = vault.get_user_codebooks("alice").unwrap().remove(0);
    vault.add_entry(book.id, "example.com", "pk", "ct", "").unwrap();
    let entry = vault.get_entries(book.id, "", 0, 1).unwrap().remove(0);

    let json = serde_json::to_value(&book).unwrap();
    assert_eq!(json["owner"], "alice");
    assert_eq!(json["name"], "Personal");

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["address"], "example.com");
    assert_eq!(json["encrypted_password"], "ct");
}
