use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use tonic::service::Interceptor;
use tonic::{Request, Status};

pub const PRODUCE_ACTION: &str = "produce";
pub const CONSUME_ACTION: &str = "consume";
/// The object every log RPC is authorized against. A policy rule with this object matches any
/// object.
pub const OBJECT_WILDCARD: &str = "*";
/// Metadata header an upstream authenticating proxy uses to pass the caller identity.
pub const SUBJECT_HEADER: &str = "x-subject";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{subject} not permitted to {action} to {object}")]
    PermissionDenied {
        subject: String,
        object: String,
        action: String,
    },

    #[error("Invalid policy on line {line}: {reason}")]
    InvalidPolicy { line: usize, reason: &'static str },

    #[error("Failed to read policy")]
    Io(#[from] io::Error),
}

/// Decides whether a caller may perform `action` on `object`.
pub trait Authorizer: Send + Sync + 'static {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> Result<(), AuthError>;
}

/// Permits everything. For deployments without an access policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _subject: &str, _object: &str, _action: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// AclAuthorizer permits exactly the `(subject, object, action)` triples listed in its policy.
///
/// The policy is CSV text with one rule per line:
///
/// ```text
/// # comment
/// p, root, *, produce
/// p, root, *, consume
/// p, reader, *, consume
/// ```
#[derive(Clone, Debug, Default)]
pub struct AclAuthorizer {
    rules: HashSet<(String, String, String)>,
}

impl AclAuthorizer {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let policy = fs::read_to_string(path)?;
        Self::parse(&policy)
    }

    pub fn parse(policy: &str) -> Result<Self, AuthError> {
        let mut rules = HashSet::new();
        for (i, line) in policy.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let invalid = |reason| AuthError::InvalidPolicy { line: i + 1, reason };
            match fields.as_slice() {
                ["p", subject, object, action] => {
                    if subject.is_empty() || object.is_empty() || action.is_empty() {
                        return Err(invalid("empty field"));
                    }
                    rules.insert((subject.to_string(), object.to_string(), action.to_string()));
                }
                ["p", ..] => return Err(invalid("expected `p, subject, object, action`")),
                _ => return Err(invalid("unknown rule type")),
            }
        }

        Ok(AclAuthorizer { rules })
    }

    fn permits(&self, subject: &str, object: &str, action: &str) -> bool {
        let rule = |object: &str| (subject.to_string(), object.to_string(), action.to_string());
        self.rules.contains(&rule(object)) || self.rules.contains(&rule(OBJECT_WILDCARD))
    }
}

impl Authorizer for AclAuthorizer {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> Result<(), AuthError> {
        if self.permits(subject, object, action) {
            return Ok(());
        }
        Err(AuthError::PermissionDenied {
            subject: subject.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        })
    }
}

/// The authenticated caller identity, as a request extension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subject(pub String);

/// Copies the [`SUBJECT_HEADER`] header into a [`Subject`] request extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubjectInterceptor;

impl Interceptor for SubjectInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let subject = match request.metadata().get(SUBJECT_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| Status::unauthenticated("Subject header is not ascii"))?
                .to_string(),
            None => return Ok(request),
        };
        request.extensions_mut().insert(Subject(subject));
        Ok(request)
    }
}

/// The caller identity of `request`, or the empty subject when none was attached.
pub(crate) fn subject_of<T>(request: &Request<T>) -> String {
    request
        .extensions()
        .get::<Subject>()
        .map(|subject| subject.0.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "
        # root can do anything
        p, root, *, produce
        p, root, *, consume

        p, reader, topic, consume
    ";

    #[test]
    fn acl_permits_listed_rules() {
        let acl = AclAuthorizer::parse(POLICY).unwrap();

        assert!(acl.authorize("root", OBJECT_WILDCARD, PRODUCE_ACTION).is_ok());
        assert!(acl.authorize("root", "anything", CONSUME_ACTION).is_ok());
        assert!(acl.authorize("reader", "topic", CONSUME_ACTION).is_ok());
    }

    #[test]
    fn acl_denies_everything_else() {
        let acl = AclAuthorizer::parse(POLICY).unwrap();

        let err = acl.authorize("reader", "topic", PRODUCE_ACTION).unwrap_err();
        assert_eq!(err.to_string(), "reader not permitted to produce to topic");
        assert!(matches!(
            acl.authorize("", OBJECT_WILDCARD, CONSUME_ACTION),
            Err(AuthError::PermissionDenied { .. })
        ));
        assert!(acl.authorize("reader", OBJECT_WILDCARD, CONSUME_ACTION).is_err());
    }

    #[test]
    fn acl_rejects_malformed_lines() {
        let err = AclAuthorizer::parse("p, root, *\n").unwrap_err();
        assert!(matches!(err, AuthError::InvalidPolicy { line: 1, .. }));

        let err = AclAuthorizer::parse("p, root, *, produce\ng, root, admin\n").unwrap_err();
        assert!(matches!(err, AuthError::InvalidPolicy { line: 2, .. }));
    }

    #[test]
    fn interceptor_attaches_subject() {
        let mut request = Request::new(());
        request.metadata_mut().insert(SUBJECT_HEADER, "root".parse().unwrap());

        let request = SubjectInterceptor.call(request).unwrap();

        assert_eq!(subject_of(&request), "root");
        assert_eq!(subject_of(&Request::new(())), "");
    }
}
