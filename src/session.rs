use serde::Serialize;

/// The `(currentUser, partner)` context the routing shell hands to every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub current_user: String,
    pub partner: String,
}

#[derive(Debug, Clone)]
struct Member {
    name: String,
    passcode: String,
}

/// The two members of a space and their fixed passcodes. Authentication is a
/// static lookup; anything stronger is out of scope.
#[derive(Debug, Clone)]
pub struct PairSpace {
    members: [Member; 2],
}

impl PairSpace {
    pub fn new(first: (&str, &str), second: (&str, &str)) -> Self {
        Self {
            members: [
                Member {
                    name: first.0.to_string(),
                    passcode: first.1.to_string(),
                },
                Member {
                    name: second.0.to_string(),
                    passcode: second.1.to_string(),
                },
            ],
        }
    }

    /// The original pair this space was built for.
    pub fn our_space() -> Self {
        Self::new(("James", "SultanRS"), ("Ari", "Carter"))
    }

    pub fn partner_of(&self, name: &str) -> Option<&str> {
        let [first, second] = &self.members;
        if first.name == name {
            Some(&second.name)
        } else if second.name == name {
            Some(&first.name)
        } else {
            None
        }
    }

    pub fn authenticate(&self, name: &str, passcode: &str) -> Option<SessionContext> {
        let member = self.members.iter().find(|member| member.name == name)?;
        if member.passcode != passcode {
            tracing::warn!(user = name, "rejected passcode attempt");
            return None;
        }
        let partner = self.partner_of(name)?.to_string();
        Some(SessionContext {
            current_user: member.name.clone(),
            partner,
        })
    }
}
