use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SyncError};
use crate::models::EmailMessage;

/// Source of bank notifications. Read/unread state is how failed items get
/// retried on the next run.
pub trait Mailbox {
    fn fetch_unread(&mut self, sender: &str, mark_as_read: bool) -> Result<Vec<EmailMessage>>;
    fn mark_unread(&mut self, uid: &str) -> Result<()>;
}

const INFO_SEP: &str = ":2,";
const SEEN: char = 'S';

/// A Maildir on local disk (`new/`, `cur/`, `tmp/`), the format fetchmail,
/// mbsync and offlineimap deliver into.
#[derive(Debug)]
pub struct Maildir {
    root: PathBuf,
}

struct Entry {
    path: PathBuf,
    uid: String,
    flags: String,
}

fn split_name(file_name: &str) -> (String, String) {
    match file_name.split_once(INFO_SEP) {
        Some((uid, flags)) => (uid.to_string(), flags.to_string()),
        None => (file_name.to_string(), String::new()),
    }
}

fn with_flag(flags: &str, flag: char) -> String {
    let mut chars: Vec<char> = flags.chars().filter(|c| *c != flag).collect();
    chars.push(flag);
    chars.sort_unstable();
    chars.into_iter().collect()
}

fn without_flag(flags: &str, flag: char) -> String {
    flags.chars().filter(|c| *c != flag).collect()
}

fn extract_best_body(mail: &ParsedMail) -> Option<String> {
    fn walk(mail: &ParsedMail, mimetype: &str) -> Option<String> {
        if mail.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            if let Ok(body) = mail.get_body() {
                return Some(body);
            }
        }
        mail.subparts.iter().find_map(|part| walk(part, mimetype))
    }

    walk(mail, "text/plain")
        .or_else(|| walk(mail, "text/html"))
        .or_else(|| mail.get_body().ok())
}

fn header_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(raw.trim()).ok().or_else(|| {
        let ts = mailparse::dateparse(raw).ok()?;
        DateTime::from_timestamp(ts, 0).map(|d| d.fixed_offset())
    })
}

fn file_date(path: &Path) -> Result<DateTime<FixedOffset>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified).fixed_offset())
}

impl Maildir {
    /// Open a Maildir, creating its three subdirectories when missing.
    pub fn open(root: &Path) -> Result<Self> {
        for sub in ["new", "cur", "tmp"] {
            std::fs::create_dir_all(root.join(sub))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn entries(&self, sub: &str) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(self.root.join(sub))? {
            let dirent = dirent?;
            if !dirent.file_type()?.is_file() {
                continue;
            }
            let name = dirent.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let (uid, flags) = split_name(&name);
            entries.push(Entry {
                path: dirent.path(),
                uid,
                flags,
            });
        }
        Ok(entries)
    }

    fn unread_entries(&self) -> Result<Vec<Entry>> {
        let mut unread = self.entries("new")?;
        unread.extend(
            self.entries("cur")?
                .into_iter()
                .filter(|e| !e.flags.contains(SEEN)),
        );
        unread.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(unread)
    }

    fn read_message(&self, entry: &Entry) -> Result<EmailMessage> {
        let bytes = std::fs::read(&entry.path)?;
        let mail = parse_mail(&bytes).map_err(|e| SyncError::Mail(format!("{}: {e}", entry.uid)))?;
        let headers = &mail.headers;
        let date = match headers.get_first_value("Date").as_deref().and_then(header_date) {
            Some(d) => d,
            None => file_date(&entry.path)?,
        };
        let to = headers
            .get_first_value("To")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(EmailMessage {
            uid: entry.uid.clone(),
            subject: headers.get_first_value("Subject").unwrap_or_default(),
            sender: headers.get_first_value("From").unwrap_or_default(),
            to,
            date,
            body: extract_best_body(&mail).unwrap_or_default(),
        })
    }

    fn mark_seen(&self, entry: &Entry) -> Result<()> {
        let target = self
            .root
            .join("cur")
            .join(format!("{}{INFO_SEP}{}", entry.uid, with_flag(&entry.flags, SEEN)));
        std::fs::rename(&entry.path, target)?;
        Ok(())
    }
}

impl Mailbox for Maildir {
    fn fetch_unread(&mut self, sender: &str, mark_as_read: bool) -> Result<Vec<EmailMessage>> {
        let wanted = sender.to_lowercase();
        let mut messages = Vec::new();
        for entry in self.unread_entries()? {
            let message = match self.read_message(&entry) {
                Ok(m) => m,
                Err(e) => {
                    warn!(uid = %entry.uid, error = %e, "skipping unreadable message");
                    continue;
                }
            };
            if !message.sender.to_lowercase().contains(&wanted) {
                continue;
            }
            if mark_as_read {
                if let Err(e) = self.mark_seen(&entry) {
                    // Not handed to the batch, so it must stay unread for the next run.
                    error!(uid = %entry.uid, error = %e, "failed to mark message as read, leaving it for the next run");
                    continue;
                }
            }
            messages.push(message);
        }
        info!(count = messages.len(), sender, "found unread messages");
        Ok(messages)
    }

    fn mark_unread(&mut self, uid: &str) -> Result<()> {
        if self.entries("new")?.iter().any(|e| e.uid == uid) {
            return Ok(());
        }
        let entry = self
            .entries("cur")?
            .into_iter()
            .find(|e| e.uid == uid)
            .ok_or_else(|| SyncError::Mail(format!("No message with uid {uid}")))?;
        let target = self
            .root
            .join("cur")
            .join(format!("{uid}{INFO_SEP}{}", without_flag(&entry.flags, SEEN)));
        std::fs::rename(&entry.path, target)?;
        debug!(uid, "marked message as unread");
        Ok(())
    }
}
