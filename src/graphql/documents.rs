// GraphQL documents sent to the origin. Selection sets match the wire types in `types`.

pub const USERS_QUERY: &str = "{ users { id name email settings } }";

pub const MOOD_ENTRIES_QUERY: &str = "\
query MoodEntries($userIds: [ID!], $first: Int, $after: String) {
  moodEntries(userIds: $userIds, first: $first, after: $after) {
    edges {
      cursor
      node { id mood delta notes createdAt archivedAt user { id name } tags { name metadata } }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

pub const TAGS_QUERY: &str = "\
query Tags($search: String, $includeArchived: Boolean, $first: Int, $after: String) {
  tags(search: $search, includeArchived: $includeArchived, first: $first, after: $after) {
    edges { cursor node { name metadata archivedAt } }
    pageInfo { hasNextPage endCursor }
  }
}";

pub const LOG_MOOD_MUTATION: &str = "\
mutation LogMood($input: LogMoodInput!) {
  logMood(input: $input) { id mood notes createdAt tags { name metadata } }
}";

pub const ARCHIVE_MOOD_ENTRY_MUTATION: &str = "\
mutation ArchiveMoodEntry($id: ID!) {
  archiveMoodEntry(id: $id) { id mood delta notes createdAt archivedAt tags { name metadata } }
}";

pub const UPDATE_TAG_METADATA_MUTATION: &str = "\
mutation UpdateTagMetadata($input: UpdateTagMetadataInput!) {
  updateTagMetadata(input: $input) { name metadata archivedAt }
}";

pub const ARCHIVE_TAG_MUTATION: &str = "\
mutation ArchiveTag($name: String!) {
  archiveTag(name: $name) { name metadata archivedAt }
}";

pub const UNARCHIVE_TAG_MUTATION: &str = "\
mutation UnarchiveTag($name: String!) {
  unarchiveTag(name: $name) { name metadata archivedAt }
}";

pub const SEND_LOGIN_CODE_MUTATION: &str = "\
mutation SendLoginCode($email: String!) {
  sendLoginCode(email: $email) { success }
}";

pub const VERIFY_LOGIN_CODE_MUTATION: &str = "\
mutation VerifyLoginCode($email: String!, $code: String!) {
  verifyLoginCode(email: $email, code: $code) { token user { id name email settings } }
}";
