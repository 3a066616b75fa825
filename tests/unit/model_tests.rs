//! Unit tests for file entries and mailbox snapshots

#[cfg(test)]
mod tests {
    use mailcull::{FileEntry, MailboxSnapshot, MaildirKind};
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn test_file_entry_structural_equality() {
        let a = FileEntry::new("cur/msg1", 100, 500);
        let b = FileEntry::new("cur/msg1", 100, 500);
        let c = FileEntry::new("cur/msg1", 101, 500);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<FileEntry> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_file_entry_orders_by_size_then_time() {
        let mut entries = vec![
            FileEntry::new("cur/c", 300, 10),
            FileEntry::new("cur/a", 200, 50),
            FileEntry::new("cur/b", 100, 10),
        ];
        entries.sort();

        let order: Vec<&str> = entries.iter().map(FileEntry::relpath).collect();
        assert_eq!(order, vec!["cur/b", "cur/c", "cur/a"]);
    }

    #[test]
    fn test_kind_and_folder() {
        let top = FileEntry::new("new/1700000000.M1P2.host", 0, 1);
        let nested = FileEntry::new("Archive/2023/cur/x", 0, 1);
        let extra = FileEntry::new("password", 0, 1);

        assert_eq!(top.kind(), Some(MaildirKind::New));
        assert_eq!(top.folder(), None);
        assert_eq!(nested.kind(), Some(MaildirKind::Cur));
        assert_eq!(nested.folder(), Some("Archive/2023"));
        assert_eq!(extra.kind(), None);
    }

    #[test]
    fn test_maildir_kind_parsing() {
        assert_eq!("cur".parse::<MaildirKind>(), Ok(MaildirKind::Cur));
        assert_eq!("TMP".parse::<MaildirKind>(), Ok(MaildirKind::Tmp));
        assert!("inbox".parse::<MaildirKind>().is_err());
        assert_eq!(MaildirKind::New.to_string(), "new");
    }

    fn sample() -> MailboxSnapshot {
        MailboxSnapshot::new(
            PathBuf::from("/home/vmail/mail/example.org/ci-abc123@example.org"),
            vec![
                FileEntry::new("cur/msg1", 10, 3),
                FileEntry::new("new/msg2", 20, 6),
                FileEntry::new("Sent/cur/msg3", 30, 9),
            ],
            vec![
                FileEntry::new("index-something", 5, 3),
                FileEntry::new("password", 42, 3),
                FileEntry::new("large", 5, 1000),
            ],
        )
    }

    #[test]
    fn test_snapshot_accessors() {
        let snap = sample();

        assert_eq!(snap.address(), "ci-abc123@example.org");
        assert_eq!(snap.local_part(), "ci-abc123");
        assert_eq!(snap.last_login(), Some(42));
        assert_eq!(snap.messages().len(), 3);
        assert_eq!(snap.message_size(), 18);
        assert_eq!(snap.extra_size(), 1006);
        assert_eq!(snap.total_size(), 1024);
    }

    #[test]
    fn test_extra_files_sorted_largest_first() {
        let snap = sample();
        let extra = snap.extra_files();

        assert_eq!(extra.len(), 3);
        assert_eq!(extra[0].relpath(), "large");
        assert_eq!(extra[0].size(), 1000);
    }

    #[test]
    fn test_messages_of_kind_includes_nested_folders() {
        let snap = sample();

        let cur: Vec<&str> = snap
            .messages_of(MaildirKind::Cur)
            .into_iter()
            .map(FileEntry::relpath)
            .collect();
        assert_eq!(cur, vec!["cur/msg1", "Sent/cur/msg3"]);
        assert_eq!(snap.messages_of(MaildirKind::New).len(), 1);
        assert!(snap.messages_of(MaildirKind::Tmp).is_empty());
    }

    #[test]
    fn test_no_password_means_no_login() {
        let snap = MailboxSnapshot::new(PathBuf::from("/m/a@b"), vec![], vec![]);
        assert_eq!(snap.last_login(), None);
    }
}
