use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

/// A [`ToSocketAddrs`] that also remembers the name the user typed.
///
/// The hostname is what known_hosts entries are keyed on, so it has to survive
/// name resolution.
pub trait ToSocketAddrsWithHostname {
    type Iter: Iterator<Item = SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter>;

    fn hostname(&self) -> String;
}

impl ToSocketAddrsWithHostname for SocketAddr {
    type Iter = std::option::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        ToSocketAddrs::to_socket_addrs(self)
    }

    fn hostname(&self) -> String {
        self.ip().to_string()
    }
}

impl ToSocketAddrsWithHostname for (IpAddr, u16) {
    type Iter = std::option::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        ToSocketAddrs::to_socket_addrs(self)
    }

    fn hostname(&self) -> String {
        self.0.to_string()
    }
}

impl ToSocketAddrsWithHostname for (&str, u16) {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        ToSocketAddrs::to_socket_addrs(self)
    }

    fn hostname(&self) -> String {
        self.0.to_string()
    }
}

impl ToSocketAddrsWithHostname for (String, u16) {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        ToSocketAddrs::to_socket_addrs(&(self.0.as_str(), self.1))
    }

    fn hostname(&self) -> String {
        self.0.clone()
    }
}

/// `"host:port"` or `"[v6]:port"`.
impl ToSocketAddrsWithHostname for str {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        ToSocketAddrs::to_socket_addrs(self)
    }

    fn hostname(&self) -> String {
        if let Ok(addr) = self.parse::<SocketAddr>() {
            return addr.ip().to_string();
        }
        match self.rsplit_once(':') {
            Some((host, _port)) => host.to_string(),
            None => self.to_string(),
        }
    }
}

impl ToSocketAddrsWithHostname for String {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        ToSocketAddrsWithHostname::to_socket_addrs(self.as_str())
    }

    fn hostname(&self) -> String {
        self.as_str().hostname()
    }
}

impl<T: ToSocketAddrsWithHostname + ?Sized> ToSocketAddrsWithHostname for &T {
    type Iter = T::Iter;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        (**self).to_socket_addrs()
    }

    fn hostname(&self) -> String {
        (**self).hostname()
    }
}
