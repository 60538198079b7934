use chrono::Utc;
use rusqlite::{Connection, Row};
use tracing::debug;
use warbler_types::models::UserStats;

use crate::models::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, MessageRow, NewUser, ProfileChanges, UserRow,
};
use crate::{Database, DbError, Result};

const USER_SELECT: &str = "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url, \
     u.bio, u.location, u.password FROM users u";

const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url \
     FROM messages m JOIN users u ON u.id = m.user_id";

impl Database {
    // -- Users --

    /// Persist a signed-up account and return the stored row.
    pub fn insert_user(&self, user: &NewUser) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (email, username, image_url, password) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    user.email,
                    user.username,
                    user.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                    user.password_hash,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_user_by_id(&tx, id)?
                .ok_or_else(|| DbError::Missing(format!("user {} vanished after insert", id)))?;
            tx.commit()?;

            debug!("Inserted user {}", row);
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{USER_SELECT} WHERE u.username = ?1"),
                [username],
                user_from_row,
            )
            .optional()
        })
    }

    /// Users whose username contains `needle`, or everyone when absent.
    /// Matching is literal and case-sensitive: `%` and `_` are plain characters.
    pub fn search_users(&self, needle: Option<&str>) -> Result<Vec<UserRow>> {
        let needle = needle.unwrap_or_default();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{USER_SELECT} WHERE instr(u.username, ?1) > 0 ORDER BY u.username"
            ))?;
            let rows = stmt
                .query_map([needle], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_profile(&self, id: i64, changes: &ProfileChanges) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE users SET username = ?1, email = ?2, image_url = ?3, header_image_url = ?4,
                     bio = ?5, location = ?6
                 WHERE id = ?7",
                rusqlite::params![
                    changes.username,
                    changes.email,
                    changes.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                    changes
                        .header_image_url
                        .as_deref()
                        .unwrap_or(DEFAULT_HEADER_IMAGE_URL),
                    changes.bio,
                    changes.location,
                    id,
                ],
            )?;
            let row = query_user_by_id(&tx, id)?
                .ok_or_else(|| DbError::Missing(format!("user {} does not exist", id)))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Delete an account. Messages, follows and likes go with it (ON DELETE CASCADE).
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// Live relation counts for a user.
    pub fn user_stats(&self, id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |row| {
                    Ok(UserStats {
                        messages: row.get::<_, i64>(0)? as u64,
                        followers: row.get::<_, i64>(1)? as u64,
                        following: row.get::<_, i64>(2)? as u64,
                        likes: row.get::<_, i64>(3)? as u64,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Follows --

    /// Add the edge `follower -> followee`. Returns false if it already existed.
    /// Following yourself is rejected by the schema.
    pub fn follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO follows (follower_id, followee_id) VALUES (?1, ?2)
                 ON CONFLICT (follower_id, followee_id) DO NOTHING",
                [follower_id, followee_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                [follower_id, followee_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)",
                [follower_id, followee_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.is_following(other_id, user_id)
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{USER_SELECT} JOIN follows f ON f.followee_id = u.id
                 WHERE f.follower_id = ?1 ORDER BY u.username"
            ))?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users following `user_id`.
    pub fn followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{USER_SELECT} JOIN follows f ON f.follower_id = u.id
                 WHERE f.followee_id = ?1 ORDER BY u.username"
            ))?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: i64, text: &str) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (text, timestamp, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![text, Utc::now(), user_id],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_message(&tx, id)?
                .ok_or_else(|| DbError::Missing(format!("message {} vanished after insert", id)))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// Newest messages written by `user_id`.
    pub fn messages_by_user(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT} WHERE m.user_id = ?1
                 ORDER BY m.timestamp DESC, m.id DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Newest messages written by `user_id` or anyone `user_id` follows.
    pub fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                    OR m.user_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1)
                 ORDER BY m.timestamp DESC, m.id DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Add a like. Returns false if the user already liked the message.
    pub fn add_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)
                 ON CONFLICT (user_id, message_id) DO NOTHING",
                [user_id, message_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn like_count(&self, message_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE message_id = ?1",
                [message_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn liked_message_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1 ORDER BY message_id")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Messages `user_id` has liked, newest first.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT} JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1
                 ORDER BY m.timestamp DESC, m.id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    conn.query_row(&format!("{USER_SELECT} WHERE u.id = ?1"), [id], user_from_row)
        .optional()
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    conn.query_row(
        &format!("{MESSAGE_SELECT} WHERE m.id = ?1"),
        [id],
        message_from_row,
    )
    .optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        image_url: row.get(3)?,
        header_image_url: row.get(4)?,
        bio: row.get(5)?,
        location: row.get(6)?,
        password: row.get(7)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        image_url: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(n: u32) -> NewUser {
        NewUser {
            username: format!("testuser{}", n),
            email: format!("test{}@test.com", n),
            password_hash: format!("HASHED_PASSWORD{}", n),
            image_url: None,
        }
    }

    fn setup() -> (Database, UserRow, UserRow) {
        let db = Database::open_in_memory().unwrap();
        let u1 = db.insert_user(&new_user(1)).unwrap();
        let u2 = db.insert_user(&new_user(2)).unwrap();
        (db, u1, u2)
    }

    #[test]
    fn new_user_has_defaults_and_no_relations() {
        let (db, u1, _) = setup();

        assert_eq!(db.user_stats(u1.id).unwrap(), UserStats::default());
        assert_eq!(u1.to_string(), format!("<User #{}: testuser1, test1@test.com>", u1.id));
        assert_eq!(u1.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(u1.header_image_url, DEFAULT_HEADER_IMAGE_URL);
        assert_eq!(u1.bio, None);
        assert_eq!(u1.password, "HASHED_PASSWORD1");
    }

    #[test]
    fn duplicate_username_is_integrity_error() {
        let (db, _, _) = setup();
        let mut dup = new_user(1);
        dup.email = "other@test.com".into();

        let err = db.insert_user(&dup).unwrap_err();
        assert!(err.is_integrity(), "unexpected error: {err}");
    }

    #[test]
    fn duplicate_email_is_integrity_error() {
        let (db, _, _) = setup();
        let mut dup = new_user(3);
        dup.email = "test1@test.com".into();

        assert!(db.insert_user(&dup).unwrap_err().is_integrity());
    }

    #[test]
    fn follow_updates_both_sides() {
        let (db, u1, u2) = setup();
        assert!(db.follow(u1.id, u2.id).unwrap());

        let s1 = db.user_stats(u1.id).unwrap();
        let s2 = db.user_stats(u2.id).unwrap();
        assert_eq!((s1.following, s1.followers), (1, 0));
        assert_eq!((s2.following, s2.followers), (0, 1));

        assert_eq!(db.followers(u2.id).unwrap()[0].id, u1.id);
        assert_eq!(db.following(u1.id).unwrap()[0].id, u2.id);
    }

    #[test]
    fn is_following_and_is_followed_by() {
        let (db, u1, u2) = setup();
        db.follow(u1.id, u2.id).unwrap();

        assert!(db.is_following(u1.id, u2.id).unwrap());
        assert!(!db.is_following(u2.id, u1.id).unwrap());
        assert!(db.is_followed_by(u2.id, u1.id).unwrap());
        assert!(!db.is_followed_by(u1.id, u2.id).unwrap());
    }

    #[test]
    fn follow_is_idempotent_and_unfollow_removes() {
        let (db, u1, u2) = setup();
        assert!(db.follow(u1.id, u2.id).unwrap());
        assert!(!db.follow(u1.id, u2.id).unwrap());
        assert_eq!(db.user_stats(u2.id).unwrap().followers, 1);

        assert!(db.unfollow(u1.id, u2.id).unwrap());
        assert!(!db.unfollow(u1.id, u2.id).unwrap());
        assert!(!db.is_following(u1.id, u2.id).unwrap());
    }

    #[test]
    fn self_follow_is_rejected() {
        let (db, u1, _) = setup();
        assert!(db.follow(u1.id, u1.id).unwrap_err().is_integrity());
    }

    #[test]
    fn liking_twice_keeps_one_edge() {
        let (db, u1, u2) = setup();
        let msg = db.insert_message(u2.id, "hello").unwrap();

        assert!(db.add_like(u1.id, msg.id).unwrap());
        assert!(!db.add_like(u1.id, msg.id).unwrap());
        assert_eq!(db.like_count(msg.id).unwrap(), 1);
        assert_eq!(db.user_stats(u1.id).unwrap().likes, 1);
        assert_eq!(db.liked_message_ids(u1.id).unwrap(), vec![msg.id]);

        assert!(db.remove_like(u1.id, msg.id).unwrap());
        assert_eq!(db.like_count(msg.id).unwrap(), 0);
    }

    #[test]
    fn liking_missing_message_is_integrity_error() {
        let (db, u1, _) = setup();
        assert!(db.add_like(u1.id, 4242).unwrap_err().is_integrity());
    }

    #[test]
    fn message_belongs_to_author() {
        let (db, u1, _) = setup();
        let msg = db.insert_message(u1.id, "first warble").unwrap();

        let fetched = db.get_message(msg.id).unwrap().unwrap();
        assert_eq!(fetched.text, "first warble");
        assert_eq!(fetched.user_id, u1.id);
        assert_eq!(fetched.username, "testuser1");
        assert_eq!(db.user_stats(u1.id).unwrap().messages, 1);
    }

    #[test]
    fn message_text_length_is_checked() {
        let (db, u1, _) = setup();
        assert!(db.insert_message(u1.id, "").unwrap_err().is_integrity());
        assert!(db.insert_message(u1.id, &"a".repeat(141)).unwrap_err().is_integrity());
        assert!(db.insert_message(u1.id, &"a".repeat(140)).is_ok());
    }

    #[test]
    fn message_for_missing_user_is_integrity_error() {
        let (db, _, _) = setup();
        assert!(db.insert_message(9999, "orphan").unwrap_err().is_integrity());
    }

    #[test]
    fn deleting_user_cascades() {
        let (db, u1, u2) = setup();
        let own = db.insert_message(u1.id, "mine").unwrap();
        let theirs = db.insert_message(u2.id, "theirs").unwrap();
        db.follow(u1.id, u2.id).unwrap();
        db.follow(u2.id, u1.id).unwrap();
        db.add_like(u1.id, theirs.id).unwrap();
        db.add_like(u2.id, own.id).unwrap();

        assert!(db.delete_user(u1.id).unwrap());

        assert!(db.get_user_by_id(u1.id).unwrap().is_none());
        assert!(db.get_message(own.id).unwrap().is_none());
        assert_eq!(db.like_count(theirs.id).unwrap(), 0);
        assert_eq!(db.user_stats(u2.id).unwrap(), UserStats {
            messages: 1,
            ..UserStats::default()
        });
    }

    #[test]
    fn deleting_message_drops_its_likes() {
        let (db, u1, u2) = setup();
        let msg = db.insert_message(u2.id, "short lived").unwrap();
        db.add_like(u1.id, msg.id).unwrap();

        assert!(db.delete_message(msg.id).unwrap());
        assert!(!db.delete_message(msg.id).unwrap());
        assert_eq!(db.user_stats(u1.id).unwrap().likes, 0);
    }

    #[test]
    fn timeline_covers_self_and_followed() {
        let (db, u1, u2) = setup();
        let u3 = db.insert_user(&new_user(3)).unwrap();
        db.insert_message(u1.id, "from one").unwrap();
        db.insert_message(u2.id, "from two").unwrap();
        db.insert_message(u3.id, "from three").unwrap();
        db.follow(u1.id, u2.id).unwrap();

        let texts: Vec<String> = db
            .timeline(u1.id, 100)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"from one".to_string()));
        assert!(texts.contains(&"from two".to_string()));
    }

    #[test]
    fn timeline_is_newest_first() {
        let (db, u1, _) = setup();
        let first = db.insert_message(u1.id, "older").unwrap();
        let second = db.insert_message(u1.id, "newer").unwrap();

        let ids: Vec<i64> = db.timeline(u1.id, 100).unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn search_matches_substring() {
        let (db, _, _) = setup();
        db.insert_user(&NewUser {
            username: "someone".into(),
            email: "someone@test.com".into(),
            password_hash: "x".into(),
            image_url: Some("/img/me.png".into()),
        })
        .unwrap();

        assert_eq!(db.search_users(Some("testuser")).unwrap().len(), 2);
        assert_eq!(db.search_users(None).unwrap().len(), 3);
        let found = db.search_users(Some("some")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].image_url, "/img/me.png");
    }

    #[test]
    fn search_is_literal_and_case_sensitive() {
        let (db, _, _) = setup();

        assert!(db.search_users(Some("_")).unwrap().is_empty());
        assert!(db.search_users(Some("%")).unwrap().is_empty());
        assert!(db.search_users(Some("TESTUSER")).unwrap().is_empty());
        assert_eq!(db.search_users(Some("user1")).unwrap().len(), 1);
    }

    #[test]
    fn update_profile_resets_blank_images() {
        let (db, u1, _) = setup();
        let updated = db
            .update_profile(u1.id, &ProfileChanges {
                username: "renamed".into(),
                email: "renamed@test.com".into(),
                image_url: None,
                header_image_url: Some("/hdr.png".into()),
                bio: Some("testbio1".into()),
                location: Some("testlocation1".into()),
            })
            .unwrap();

        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(updated.header_image_url, "/hdr.png");
        assert_eq!(updated.location.as_deref(), Some("testlocation1"));
        assert!(db.get_user_by_username("testuser1").unwrap().is_none());
    }

    #[test]
    fn update_profile_to_taken_username_fails() {
        let (db, u1, _) = setup();
        let err = db
            .update_profile(u1.id, &ProfileChanges {
                username: "testuser2".into(),
                email: "test1@test.com".into(),
                image_url: None,
                header_image_url: None,
                bio: None,
                location: None,
            })
            .unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn update_profile_of_missing_user_is_not_integrity() {
        let (db, _, _) = setup();
        let err = db
            .update_profile(424242, &ProfileChanges {
                username: "ghost".into(),
                email: "ghost@test.com".into(),
                image_url: None,
                header_image_url: None,
                bio: None,
                location: None,
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Missing(_)), "unexpected error: {err}");
        assert!(!err.is_integrity());
    }
}
