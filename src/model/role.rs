#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    Accountant = 4,
    Intern = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::Accountant),
            5 => Some(Role::Intern),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_ids_only() {
        assert_eq!(Role::from_id(4), Some(Role::Accountant));
        assert_eq!(Role::from_id(Role::Intern as u8), Some(Role::Intern));
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }
}
